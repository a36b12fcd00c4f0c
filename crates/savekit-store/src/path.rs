use std::path::{Path, PathBuf};

use savekit_schema::Registry;

use crate::error::StoreResult;

/// Maps a storage key and file extension to a file under the writable root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `root/{key}{extension}`.
    pub fn path_for_key(&self, key: &str, extension: &str) -> PathBuf {
        self.root.join(format!("{key}{extension}"))
    }

    /// File for `T` as registered in `registry`.
    pub fn path_for<T: 'static>(&self, registry: &Registry, extension: &str) -> StoreResult<PathBuf> {
        Ok(self.path_for_key(registry.storage_key::<T>()?, extension))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use savekit_schema::{Schema, SchemaError};

    struct Player;

    #[test]
    fn key_and_extension_join_under_root() {
        let paths = PathResolver::new("/data/saves");
        assert_eq!(
            paths.path_for_key("player", ".json"),
            PathBuf::from("/data/saves/player.json")
        );
        assert_eq!(paths.root(), Path::new("/data/saves"));
    }

    #[test]
    fn path_for_registered_type() {
        let registry = Registry::builder()
            .register(Schema::<Player>::builder("player").build())
            .build()
            .unwrap();
        let paths = PathResolver::new("root");
        assert_eq!(
            paths.path_for::<Player>(&registry, ".bin").unwrap(),
            PathBuf::from("root/player.bin")
        );
        assert!(matches!(
            paths.path_for::<String>(&registry, ".bin"),
            Err(crate::StoreError::Configuration(SchemaError::UnregisteredType(_)))
        ));
    }
}
