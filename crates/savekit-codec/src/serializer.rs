use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CodecResult;

/// Byte encoding used by a save store.
///
/// A serializer is immutable once built and may be shared by concurrent
/// operations. Payloads for one type are written to
/// `{storage_key}{file_extension}`, so two serializers with different
/// extensions never overwrite each other's files.
pub trait Serializer: Send + Sync {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> CodecResult<Vec<u8>>;

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> CodecResult<T>;

    /// Extension including the leading dot, e.g. `".json"`.
    fn file_extension(&self) -> &str;

    /// Short name used in logs and errors.
    fn format_name(&self) -> &'static str;
}
