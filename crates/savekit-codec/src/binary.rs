use std::sync::Arc;

use savekit_refs::{scope, ResolverChains};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::trace;

use crate::error::{CodecError, CodecResult};
use crate::serializer::Serializer;

const FORMAT: &str = "bincode";

/// Compact binary serializer with external reference resolution.
///
/// Encoding and decoding run inside a resolution scope for the serializer's
/// chains: every [`ExternalRef`](savekit_refs::ExternalRef) reached is
/// written as the token of the first resolver that claims it, and read back
/// through the resolver chain for that token's kind.
#[derive(Clone, Debug, Default)]
pub struct BincodeSerializer {
    chains: Arc<ResolverChains>,
}

impl BincodeSerializer {
    pub fn new(chains: Arc<ResolverChains>) -> Self {
        Self { chains }
    }

    pub fn chains(&self) -> &Arc<ResolverChains> {
        &self.chains
    }
}

impl Serializer for BincodeSerializer {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> CodecResult<Vec<u8>> {
        let bytes = scope::with_chains(&self.chains, || bincode::serialize(value))
            .map_err(|e| CodecError::encode(FORMAT, e))?;
        trace!(bytes = bytes.len(), "bincode encoded");
        Ok(bytes)
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> CodecResult<T> {
        scope::with_chains(&self.chains, || bincode::deserialize(bytes))
            .map_err(|e| CodecError::decode(FORMAT, e))
    }

    fn file_extension(&self) -> &str {
        ".bin"
    }

    fn format_name(&self) -> &'static str {
        FORMAT
    }
}
