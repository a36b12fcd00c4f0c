use std::path::{Path, PathBuf};

use savekit_codec::SaveFormat;
use savekit_schema::ConversionPolicy;
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Configuration for a save store.
///
/// Every field has a default, so a TOML file only needs the keys it
/// changes:
///
/// ```toml
/// root = "/home/ada/.local/share/game/saves"
/// format = "binary"
/// conversion_policy = "abort"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Writable directory holding one file per persisted type.
    pub root: PathBuf,
    /// Format used by stores built with `from_config`.
    pub format: SaveFormat,
    /// What member-subset loads do with values that fail to convert.
    pub conversion_policy: ConversionPolicy,
    /// Write to a temporary file and rename it over the destination.
    ///
    /// An existing save keeps its permissions. On Unix, a file first created
    /// by a blocking atomic save is readable by its owner only.
    pub atomic_writes: bool,
    /// Create `root` on first write instead of failing when it is missing.
    pub create_root: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("saves"),
            format: SaveFormat::default(),
            conversion_policy: ConversionPolicy::default(),
            atomic_writes: true,
            create_root: false,
        }
    }
}

impl StoreConfig {
    /// Default configuration rooted at `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> StoreResult<Self> {
        let config: Self =
            toml::from_str(s).map_err(|e| StoreError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_toml_file(path: &Path) -> StoreResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> StoreResult<()> {
        if self.root.as_os_str().is_empty() {
            return Err(StoreError::InvalidConfig("root must not be empty".into()));
        }
        Ok(())
    }
}
