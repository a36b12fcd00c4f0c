use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use savekit_refs::ResolverChains;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::binary::BincodeSerializer;
use crate::error::{CodecError, CodecResult};
use crate::json::JsonSerializer;
use crate::serializer::Serializer;

/// Built-in payload formats, selectable by name in configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveFormat {
    /// Bincode with reference resolution.
    Binary,
    /// Indented JSON.
    #[default]
    Json,
}

impl SaveFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Binary => "binary",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for SaveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SaveFormat {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "binary" | "bin" | "bincode" => Ok(Self::Binary),
            "json" => Ok(Self::Json),
            _ => Err(CodecError::UnknownFormat(s.to_string())),
        }
    }
}

/// One of the built-in serializers, chosen at runtime.
#[derive(Clone, Debug)]
pub enum FormatSerializer {
    Binary(BincodeSerializer),
    Json(JsonSerializer),
}

impl FormatSerializer {
    /// Build the serializer for `format`. `chains` are only used by
    /// [`SaveFormat::Binary`].
    pub fn for_format(format: SaveFormat, chains: Arc<ResolverChains>) -> Self {
        match format {
            SaveFormat::Binary => Self::Binary(BincodeSerializer::new(chains)),
            SaveFormat::Json => Self::Json(JsonSerializer::new()),
        }
    }

    pub fn format(&self) -> SaveFormat {
        match self {
            Self::Binary(_) => SaveFormat::Binary,
            Self::Json(_) => SaveFormat::Json,
        }
    }
}

impl Serializer for FormatSerializer {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> CodecResult<Vec<u8>> {
        match self {
            Self::Binary(s) => s.encode(value),
            Self::Json(s) => s.encode(value),
        }
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> CodecResult<T> {
        match self {
            Self::Binary(s) => s.decode(bytes),
            Self::Json(s) => s.decode(bytes),
        }
    }

    fn file_extension(&self) -> &str {
        match self {
            Self::Binary(s) => s.file_extension(),
            Self::Json(s) => s.file_extension(),
        }
    }

    fn format_name(&self) -> &'static str {
        match self {
            Self::Binary(s) => s.format_name(),
            Self::Json(s) => s.format_name(),
        }
    }
}

impl From<BincodeSerializer> for FormatSerializer {
    fn from(s: BincodeSerializer) -> Self {
        Self::Binary(s)
    }
}

impl From<JsonSerializer> for FormatSerializer {
    fn from(s: JsonSerializer) -> Self {
        Self::Json(s)
    }
}
