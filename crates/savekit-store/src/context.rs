use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use savekit_codec::Serializer;
use savekit_schema::{ApplyReport, MemberRecord, Registry};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::path::PathResolver;

/// Everything a store operation needs, passed explicitly: where files live,
/// which types are persisted, how payloads are encoded, and the policies
/// from [`StoreConfig`].
///
/// The sync and async façades wrap the same context; only their I/O
/// differs.
#[derive(Clone, Debug)]
pub struct StoreContext<S> {
    paths: PathResolver,
    registry: Arc<Registry>,
    serializer: S,
    config: StoreConfig,
}

impl<S: Serializer> StoreContext<S> {
    pub fn new(config: StoreConfig, registry: Arc<Registry>, serializer: S) -> Self {
        Self {
            paths: PathResolver::new(config.root.clone()),
            registry,
            serializer,
            config,
        }
    }

    pub fn paths(&self) -> &PathResolver {
        &self.paths
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn serializer(&self) -> &S {
        &self.serializer
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// File holding `T`'s payload for this serializer.
    pub fn path_for<T: 'static>(&self) -> StoreResult<PathBuf> {
        self.paths
            .path_for::<T>(&self.registry, self.serializer.file_extension())
    }

    pub(crate) fn encode<T: Serialize + ?Sized>(&self, value: &T) -> StoreResult<Vec<u8>> {
        self.serializer
            .encode(value)
            .map_err(|source| StoreError::Serialization {
                type_name: std::any::type_name::<T>(),
                source,
            })
    }

    pub(crate) fn decode<T: DeserializeOwned>(&self, path: &Path, bytes: &[u8]) -> StoreResult<T> {
        self.serializer
            .decode(bytes)
            .map_err(|source| StoreError::Deserialization {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Encode the tagged members of `value` as a record payload.
    pub(crate) fn encode_members<T: 'static>(&self, value: &T) -> StoreResult<Vec<u8>> {
        let record = self.registry.schema::<T>()?.build_record(value);
        self.encode(&record)
    }

    /// Decode a record payload and apply it under the configured policy.
    pub(crate) fn apply_members<T: 'static>(
        &self,
        target: &mut T,
        path: &Path,
        bytes: &[u8],
    ) -> StoreResult<ApplyReport> {
        let schema = self.registry.schema::<T>()?;
        let record: MemberRecord = self.decode(path, bytes)?;
        Ok(schema.apply_record(target, &record, self.config.conversion_policy)?)
    }

    /// Copy the read/write properties of a freshly decoded `loaded` onto `target`.
    pub(crate) fn copy_loaded<T: 'static>(&self, loaded: &T, target: &mut T) -> StoreResult<usize> {
        Ok(self.registry.schema::<T>()?.copy_properties(loaded, target))
    }
}

/// Absent and empty files both read as "nothing saved".
pub(crate) fn payload(path: &Path, read: io::Result<Vec<u8>>) -> StoreResult<Option<Vec<u8>>> {
    match read {
        Ok(bytes) if bytes.is_empty() => {
            debug!(path = %path.display(), "save file is empty");
            Ok(None)
        }
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no save file");
            Ok(None)
        }
        Err(e) => Err(StoreError::io(path, e)),
    }
}

/// Removing a missing file is not an error. Returns whether a file was removed.
pub(crate) fn removed(path: &Path, result: io::Result<()>) -> StoreResult<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(StoreError::io(path, e)),
    }
}

/// Sibling temporary path used for atomic writes.
pub(crate) fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.{}.tmp", uuid::Uuid::new_v4().simple()))
}
