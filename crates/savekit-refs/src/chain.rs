use std::fmt;

use tracing::trace;

use crate::handle::ExternalRef;
use crate::token::ReferenceToken;
use crate::traits::{GuidReferenceResolver, IndexReferenceResolver, StringReferenceResolver};

/// Three ordered resolver lists, one per token kind.
///
/// Resolvers are appended to the tail, so the first registered resolver is
/// tried first and the first one that accepts wins. Chains are only mutated
/// while being assembled; once shared behind an `Arc` by a serializer they
/// are read-only and safe to use from concurrent operations.
#[derive(Default)]
pub struct ResolverChains {
    strings: Vec<Box<dyn StringReferenceResolver>>,
    guids: Vec<Box<dyn GuidReferenceResolver>>,
    indices: Vec<Box<dyn IndexReferenceResolver>>,
}

impl ResolverChains {
    /// Create chains with no resolvers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a resolver to the string chain.
    pub fn add_string_resolver(&mut self, resolver: impl StringReferenceResolver + 'static) {
        self.strings.push(Box::new(resolver));
    }

    /// Append a resolver to the guid chain.
    pub fn add_guid_resolver(&mut self, resolver: impl GuidReferenceResolver + 'static) {
        self.guids.push(Box::new(resolver));
    }

    /// Append a resolver to the index chain.
    pub fn add_index_resolver(&mut self, resolver: impl IndexReferenceResolver + 'static) {
        self.indices.push(Box::new(resolver));
    }

    /// Builder-style [`Self::add_string_resolver`].
    pub fn with_string_resolver(mut self, resolver: impl StringReferenceResolver + 'static) -> Self {
        self.add_string_resolver(resolver);
        self
    }

    /// Builder-style [`Self::add_guid_resolver`].
    pub fn with_guid_resolver(mut self, resolver: impl GuidReferenceResolver + 'static) -> Self {
        self.add_guid_resolver(resolver);
        self
    }

    /// Builder-style [`Self::add_index_resolver`].
    pub fn with_index_resolver(mut self, resolver: impl IndexReferenceResolver + 'static) -> Self {
        self.add_index_resolver(resolver);
        self
    }

    pub fn string_count(&self) -> usize {
        self.strings.len()
    }

    pub fn guid_count(&self) -> usize {
        self.guids.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Returns `true` if no resolver of any kind is registered.
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty() && self.guids.is_empty() && self.indices.is_empty()
    }

    /// Ask the chains for a token standing in for `value`.
    ///
    /// The string chain is consulted first, then guid, then index. Within a
    /// chain the first resolver that claims the value wins.
    pub fn claim(&self, value: &ExternalRef) -> Option<ReferenceToken> {
        let token = self
            .strings
            .iter()
            .find_map(|r| r.claim(value))
            .map(ReferenceToken::Name)
            .or_else(|| {
                self.guids
                    .iter()
                    .find_map(|r| r.claim(value))
                    .map(ReferenceToken::Guid)
            })
            .or_else(|| {
                self.indices
                    .iter()
                    .find_map(|r| r.claim(value))
                    .map(ReferenceToken::Index)
            });
        trace!(type_name = value.type_name(), token = ?token, "claim external reference");
        token
    }

    /// Turn a token back into a live object using the matching chain.
    pub fn resolve(&self, token: &ReferenceToken) -> Option<ExternalRef> {
        match token {
            ReferenceToken::Name(id) => self.strings.iter().find_map(|r| r.resolve(id)),
            ReferenceToken::Guid(guid) => self.guids.iter().find_map(|r| r.resolve(guid)),
            ReferenceToken::Index(index) => self.indices.iter().find_map(|r| r.resolve(*index)),
        }
    }
}

impl fmt::Debug for ResolverChains {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverChains")
            .field("strings", &self.strings.len())
            .field("guids", &self.guids.len())
            .field("indices", &self.indices.len())
            .finish()
    }
}
