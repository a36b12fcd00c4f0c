use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::trace;

use crate::error::{CodecError, CodecResult};
use crate::serializer::Serializer;

const FORMAT: &str = "json";

/// UTF-8 JSON serializer.
///
/// Lossy for external references: an [`ExternalRef`](savekit_refs::ExternalRef)
/// is written as `null` and cannot be read back, so a member holding one
/// fails conversion on load and is skipped. Nesting depth on decode is
/// bounded by serde_json's recursion limit.
#[derive(Clone, Debug)]
pub struct JsonSerializer {
    pretty: bool,
}

impl JsonSerializer {
    /// Indented output.
    pub fn new() -> Self {
        Self { pretty: true }
    }

    /// Single-line output.
    pub fn compact() -> Self {
        Self { pretty: false }
    }

    pub fn is_pretty(&self) -> bool {
        self.pretty
    }
}

impl Default for JsonSerializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Serializer for JsonSerializer {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> CodecResult<Vec<u8>> {
        let encoded = if self.pretty {
            serde_json::to_vec_pretty(value)
        } else {
            serde_json::to_vec(value)
        };
        let bytes = encoded.map_err(|e| CodecError::encode(FORMAT, e))?;
        trace!(bytes = bytes.len(), "json encoded");
        Ok(bytes)
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> CodecResult<T> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::decode(FORMAT, e))
    }

    fn file_extension(&self) -> &str {
        ".json"
    }

    fn format_name(&self) -> &'static str {
        FORMAT
    }
}
