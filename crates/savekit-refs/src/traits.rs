//! Resolver traits, one per [`ReferenceToken`](crate::ReferenceToken) kind.
//!
//! A resolver either claims a value (returns its token) or declines
//! (returns `None`) so the next resolver in the chain gets a chance. The
//! same holds for resolution on the way back. Implementations must be
//! `Send + Sync`; chains are shared by every in-flight encode and decode.

use std::sync::Arc;

use uuid::Uuid;

use crate::handle::ExternalRef;

/// Resolves external objects to and from host-defined string ids.
pub trait StringReferenceResolver: Send + Sync {
    /// Return the id for `value`, or `None` to decline.
    fn claim(&self, value: &ExternalRef) -> Option<String>;

    /// Re-acquire the object for `id`, or `None` to decline.
    fn resolve(&self, id: &str) -> Option<ExternalRef>;
}

/// Resolves external objects to and from globally unique ids.
pub trait GuidReferenceResolver: Send + Sync {
    fn claim(&self, value: &ExternalRef) -> Option<Uuid>;

    fn resolve(&self, guid: &Uuid) -> Option<ExternalRef>;
}

/// Resolves external objects to and from positions in a backing table.
///
/// Claiming appends the value to the table and must return the index it now
/// occupies, which is the table length immediately before the append.
/// Resolving that index must return the same object.
pub trait IndexReferenceResolver: Send + Sync {
    fn claim(&self, value: &ExternalRef) -> Option<u32>;

    fn resolve(&self, index: u32) -> Option<ExternalRef>;
}

// Shared resolvers: the host often keeps a handle to a table resolver so it
// can inspect or seed the table around a save.

impl<R: StringReferenceResolver + ?Sized> StringReferenceResolver for Arc<R> {
    fn claim(&self, value: &ExternalRef) -> Option<String> {
        (**self).claim(value)
    }

    fn resolve(&self, id: &str) -> Option<ExternalRef> {
        (**self).resolve(id)
    }
}

impl<R: GuidReferenceResolver + ?Sized> GuidReferenceResolver for Arc<R> {
    fn claim(&self, value: &ExternalRef) -> Option<Uuid> {
        (**self).claim(value)
    }

    fn resolve(&self, guid: &Uuid) -> Option<ExternalRef> {
        (**self).resolve(guid)
    }
}

impl<R: IndexReferenceResolver + ?Sized> IndexReferenceResolver for Arc<R> {
    fn claim(&self, value: &ExternalRef) -> Option<u32> {
        (**self).claim(value)
    }

    fn resolve(&self, index: u32) -> Option<ExternalRef> {
        (**self).resolve(index)
    }
}
