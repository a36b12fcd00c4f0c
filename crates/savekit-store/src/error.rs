use std::path::PathBuf;

use savekit_codec::CodecError;
use savekit_schema::SchemaError;
use thiserror::Error;

/// Errors from save store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The type is not registered, or the registry itself is inconsistent.
    #[error("configuration error: {0}")]
    Configuration(SchemaError),

    /// The store configuration could not be parsed or is unusable.
    #[error("invalid store configuration: {0}")]
    InvalidConfig(String),

    /// I/O error reading, writing, or removing a save file.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The value could not be encoded.
    #[error("failed to serialize {type_name}: {source}")]
    Serialization {
        type_name: &'static str,
        #[source]
        source: CodecError,
    },

    /// The file exists but its payload could not be decoded.
    #[error("failed to deserialize {}: {source}", path.display())]
    Deserialization {
        path: PathBuf,
        #[source]
        source: CodecError,
    },

    /// A stored member could not be converted under
    /// [`ConversionPolicy::Abort`](savekit_schema::ConversionPolicy::Abort).
    #[error("type conversion error: {0}")]
    TypeConversion(SchemaError),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<SchemaError> for StoreError {
    fn from(err: SchemaError) -> Self {
        if err.is_configuration() {
            Self::Configuration(err)
        } else {
            Self::TypeConversion(err)
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
