use std::path::{Path, PathBuf};
use std::sync::Arc;

use savekit_codec::{FormatSerializer, Serializer};
use savekit_refs::ResolverChains;
use savekit_schema::{ApplyReport, Registry};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::TempPath;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::context::{self, StoreContext};
use crate::error::{StoreError, StoreResult};

/// Non-blocking save store built on `tokio::fs`.
///
/// Mirrors [`SaveStore`](crate::SaveStore) operation for operation. Encoding
/// and decoding happen synchronously between awaits; each operation performs
/// its file I/O as one sequential step.
#[derive(Clone, Debug)]
pub struct AsyncSaveStore<S = FormatSerializer> {
    ctx: StoreContext<S>,
}

impl AsyncSaveStore<FormatSerializer> {
    /// Store using the serializer named by `config.format`.
    pub fn from_config(
        config: StoreConfig,
        registry: Arc<Registry>,
        chains: Arc<ResolverChains>,
    ) -> Self {
        let serializer = FormatSerializer::for_format(config.format, chains);
        Self::new(config, registry, serializer)
    }
}

impl<S: Serializer> AsyncSaveStore<S> {
    /// Store over an explicit serializer.
    pub fn new(config: StoreConfig, registry: Arc<Registry>, serializer: S) -> Self {
        Self::with_context(StoreContext::new(config, registry, serializer))
    }

    pub fn with_context(ctx: StoreContext<S>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &StoreContext<S> {
        &self.ctx
    }

    /// File `T` is saved to.
    pub fn path_for<T: 'static>(&self) -> StoreResult<PathBuf> {
        self.ctx.path_for::<T>()
    }

    // ---- whole-object mode ----

    /// Encode `value` and replace the contents of its file.
    pub async fn save<T: Serialize + 'static>(&self, value: &T) -> StoreResult<()> {
        let path = self.ctx.path_for::<T>()?;
        let bytes = self.ctx.encode(value)?;
        self.write(&path, &bytes).await
    }

    /// Load `T`, or `T::default()` if nothing has been saved.
    pub async fn load<T: DeserializeOwned + Default + 'static>(&self) -> StoreResult<T> {
        Ok(self.try_load().await?.unwrap_or_default())
    }

    /// Load `T`, or `None` if its file is absent or empty.
    pub async fn try_load<T: DeserializeOwned + 'static>(&self) -> StoreResult<Option<T>> {
        let path = self.ctx.path_for::<T>()?;
        match self.read(&path).await? {
            Some(bytes) => self.ctx.decode(&path, &bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Load the saved `T` and copy its read/write properties onto `target`.
    ///
    /// Returns `false`, leaving `target` untouched, if nothing has been saved.
    pub async fn load_into<T: DeserializeOwned + 'static>(&self, target: &mut T) -> StoreResult<bool> {
        let Some(loaded) = self.try_load::<T>().await? else {
            return Ok(false);
        };
        let copied = self.ctx.copy_loaded(&loaded, target)?;
        debug!(type_name = std::any::type_name::<T>(), copied, "loaded into instance");
        Ok(true)
    }

    // ---- member-subset mode ----

    /// Save only the tagged members of `value`.
    pub async fn save_members<T: 'static>(&self, value: &T) -> StoreResult<()> {
        let path = self.ctx.path_for::<T>()?;
        let bytes = self.ctx.encode_members(value)?;
        self.write(&path, &bytes).await
    }

    /// Build a default `T` and apply the saved members to it.
    pub async fn load_members<T: Default + 'static>(&self) -> StoreResult<Option<T>> {
        self.load_members_with(T::default).await
    }

    /// Build a `T` with `factory` and apply the saved members to it.
    ///
    /// The factory only runs if a save file exists.
    pub async fn load_members_with<T: 'static>(
        &self,
        factory: impl FnOnce() -> T,
    ) -> StoreResult<Option<T>> {
        let path = self.ctx.path_for::<T>()?;
        let Some(bytes) = self.read(&path).await? else {
            return Ok(None);
        };
        let mut instance = factory();
        self.ctx.apply_members(&mut instance, &path, &bytes)?;
        Ok(Some(instance))
    }

    /// Apply the saved members to an existing instance.
    ///
    /// Returns `None` if nothing has been saved.
    pub async fn load_members_into<T: 'static>(
        &self,
        target: &mut T,
    ) -> StoreResult<Option<ApplyReport>> {
        let path = self.ctx.path_for::<T>()?;
        match self.read(&path).await? {
            Some(bytes) => self.ctx.apply_members(target, &path, &bytes).map(Some),
            None => Ok(None),
        }
    }

    // ---- housekeeping ----

    /// Whether `T` has a save file.
    pub async fn exists<T: 'static>(&self) -> StoreResult<bool> {
        let path = self.ctx.path_for::<T>()?;
        let exists = fs::try_exists(&path)
            .await
            .map_err(|e| StoreError::io(&path, e))?;
        debug!(path = %path.display(), exists, "exists");
        Ok(exists)
    }

    /// Remove `T`'s save file. A missing file is not an error.
    pub async fn delete<T: 'static>(&self) -> StoreResult<()> {
        let path = self.ctx.path_for::<T>()?;
        if context::removed(&path, fs::remove_file(&path).await)? {
            info!(path = %path.display(), "save deleted");
        }
        Ok(())
    }

    async fn read(&self, path: &Path) -> StoreResult<Option<Vec<u8>>> {
        context::payload(path, fs::read(path).await)
    }

    async fn write(&self, path: &Path, bytes: &[u8]) -> StoreResult<()> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        if self.ctx.config().create_root {
            fs::create_dir_all(dir)
                .await
                .map_err(|e| StoreError::io(dir, e))?;
        }
        if self.ctx.config().atomic_writes {
            // Removed on drop, so a failed or cancelled save leaves nothing behind.
            let tmp = TempPath::from_path(context::temp_path_for(path));
            write_temp(&tmp, path, bytes).await?;
            fs::rename(&tmp, path)
                .await
                .map_err(|e| StoreError::io(path, e))?;
            // The file now lives at `path`; only the guard remains.
            let _ = tmp.keep();
        } else {
            fs::write(path, bytes)
                .await
                .map_err(|e| StoreError::io(path, e))?;
        }
        debug!(path = %path.display(), bytes = bytes.len(), "saved");
        Ok(())
    }
}

/// Write `bytes` to `tmp`, carrying over the permissions of an existing `path`.
async fn write_temp(tmp: &Path, path: &Path, bytes: &[u8]) -> StoreResult<()> {
    let mut file = fs::File::create(tmp)
        .await
        .map_err(|e| StoreError::io(tmp, e))?;
    if let Ok(meta) = fs::metadata(path).await {
        file.set_permissions(meta.permissions())
            .await
            .map_err(|e| StoreError::io(tmp, e))?;
    }
    file.write_all(bytes)
        .await
        .map_err(|e| StoreError::io(tmp, e))?;
    file.sync_all().await.map_err(|e| StoreError::io(tmp, e))
}
