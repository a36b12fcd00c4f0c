use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use savekit_codec::{FormatSerializer, Serializer};
use savekit_refs::ResolverChains;
use savekit_schema::{ApplyReport, Registry};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::context::{self, StoreContext};
use crate::error::{StoreError, StoreResult};

/// Blocking save store.
///
/// Each persisted type lives in one file, `root/{storage_key}{extension}`.
/// Every operation performs its file I/O on the calling thread. Concurrent
/// writers of the same type are not coordinated: the last write wins.
#[derive(Clone, Debug)]
pub struct SaveStore<S = FormatSerializer> {
    ctx: StoreContext<S>,
}

impl SaveStore<FormatSerializer> {
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

impl<S: Serializer> SaveStore<S> {
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
    pub fn save<T: Serialize + 'static>(&self, value: &T) -> StoreResult<()> {
        let path = self.ctx.path_for::<T>()?;
        let bytes = self.ctx.encode(value)?;
        self.write(&path, &bytes)
    }

    /// Load `T`, or `T::default()` if nothing has been saved.
    pub fn load<T: DeserializeOwned + Default + 'static>(&self) -> StoreResult<T> {
        Ok(self.try_load()?.unwrap_or_default())
    }

    /// Load `T`, or `None` if its file is absent or empty.
    pub fn try_load<T: DeserializeOwned + 'static>(&self) -> StoreResult<Option<T>> {
        let path = self.ctx.path_for::<T>()?;
        match self.read(&path)? {
            Some(bytes) => self.ctx.decode(&path, &bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Load the saved `T` and copy its read/write properties onto `target`.
    ///
    /// Returns `false`, leaving `target` untouched, if nothing has been saved.
    pub fn load_into<T: DeserializeOwned + 'static>(&self, target: &mut T) -> StoreResult<bool> {
        let Some(loaded) = self.try_load::<T>()? else {
            return Ok(false);
        };
        let copied = self.ctx.copy_loaded(&loaded, target)?;
        debug!(type_name = std::any::type_name::<T>(), copied, "loaded into instance");
        Ok(true)
    }

    // ---- member-subset mode ----

    /// Save only the tagged members of `value`.
    pub fn save_members<T: 'static>(&self, value: &T) -> StoreResult<()> {
        let path = self.ctx.path_for::<T>()?;
        let bytes = self.ctx.encode_members(value)?;
        self.write(&path, &bytes)
    }

    /// Build a default `T` and apply the saved members to it.
    pub fn load_members<T: Default + 'static>(&self) -> StoreResult<Option<T>> {
        self.load_members_with(T::default)
    }

    /// Build a `T` with `factory` and apply the saved members to it.
    ///
    /// The factory only runs if a save file exists.
    pub fn load_members_with<T: 'static>(
        &self,
        factory: impl FnOnce() -> T,
    ) -> StoreResult<Option<T>> {
        let path = self.ctx.path_for::<T>()?;
        let Some(bytes) = self.read(&path)? else {
            return Ok(None);
        };
        let mut instance = factory();
        self.ctx.apply_members(&mut instance, &path, &bytes)?;
        Ok(Some(instance))
    }

    /// Apply the saved members to an existing instance.
    ///
    /// Returns `None` if nothing has been saved.
    pub fn load_members_into<T: 'static>(&self, target: &mut T) -> StoreResult<Option<ApplyReport>> {
        let path = self.ctx.path_for::<T>()?;
        match self.read(&path)? {
            Some(bytes) => self.ctx.apply_members(target, &path, &bytes).map(Some),
            None => Ok(None),
        }
    }

    // ---- housekeeping ----

    /// Whether `T` has a save file.
    pub fn exists<T: 'static>(&self) -> StoreResult<bool> {
        let path = self.ctx.path_for::<T>()?;
        let exists = path.try_exists().map_err(|e| StoreError::io(&path, e))?;
        debug!(path = %path.display(), exists, "exists");
        Ok(exists)
    }

    /// Remove `T`'s save file. A missing file is not an error.
    pub fn delete<T: 'static>(&self) -> StoreResult<()> {
        let path = self.ctx.path_for::<T>()?;
        if context::removed(&path, fs::remove_file(&path))? {
            info!(path = %path.display(), "save deleted");
        }
        Ok(())
    }

    fn read(&self, path: &Path) -> StoreResult<Option<Vec<u8>>> {
        context::payload(path, fs::read(path))
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> StoreResult<()> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        if self.ctx.config().create_root {
            fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;
        }
        if self.ctx.config().atomic_writes {
            let mut tmp = NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
            if let Ok(meta) = fs::metadata(path) {
                tmp.as_file()
                    .set_permissions(meta.permissions())
                    .map_err(|e| StoreError::io(tmp.path(), e))?;
            }
            tmp.write_all(bytes)
                .and_then(|()| tmp.as_file().sync_all())
                .map_err(|e| StoreError::io(tmp.path(), e))?;
            tmp.persist(path)
                .map_err(|e| StoreError::io(path, e.error))?;
        } else {
            fs::write(path, bytes).map_err(|e| StoreError::io(path, e))?;
        }
        debug!(path = %path.display(), bytes = bytes.len(), "saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use savekit_codec::{BincodeSerializer, JsonSerializer, SaveFormat};
    use savekit_refs::{ExternalRef, ObjectTableResolver};
    use savekit_schema::{ConversionPolicy, MemberDescriptor, Schema, SchemaError};
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Player {
        name: String,
        hp: i32,
        speed: f32,
    }

    impl Default for Player {
        fn default() -> Self {
            Self {
                name: "Player".into(),
                hp: 100,
                speed: 0.0,
            }
        }
    }

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct TestSaveData {
        level: i32,
        player_name: String,
        health: f32,
        secret: String,
    }

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    struct Profile {
        nickname: String,
        level: u32,
        cache_hits: u32,
    }

    #[derive(Serialize, Deserialize)]
    struct Decor {
        label: String,
        texture: ExternalRef,
    }

    fn registry() -> Arc<Registry> {
        let player = Schema::builder("player")
            .field("Name", |p: &Player| &p.name, |p: &mut Player| &mut p.name)
            .field("Hp", |p: &Player| &p.hp, |p: &mut Player| &mut p.hp)
            .field("Speed", |p: &Player| &p.speed, |p: &mut Player| &mut p.speed)
            .build();
        let save_data = Schema::builder("test_save_data")
            .field("Level", |d: &TestSaveData| &d.level, |d: &mut TestSaveData| &mut d.level)
            .field(
                "PlayerName",
                |d: &TestSaveData| &d.player_name,
                |d: &mut TestSaveData| &mut d.player_name,
            )
            .member(
                MemberDescriptor::field(
                    "Health",
                    |d: &TestSaveData| &d.health,
                    |d: &mut TestSaveData| &mut d.health,
                )
                .key("hp"),
            )
            .untagged_member(MemberDescriptor::field(
                "Secret",
                |d: &TestSaveData| &d.secret,
                |d: &mut TestSaveData| &mut d.secret,
            ))
            .build();
        let profile = Schema::builder("profile")
            .untagged_member(MemberDescriptor::property(
                "Nickname",
                |p: &Profile| p.nickname.clone(),
                |p: &mut Profile, v: String| p.nickname = v,
            ))
            .untagged_member(MemberDescriptor::property(
                "Level",
                |p: &Profile| p.level,
                |p: &mut Profile, v: u32| p.level = v,
            ))
            .untagged_member(MemberDescriptor::field(
                "CacheHits",
                |p: &Profile| &p.cache_hits,
                |p: &mut Profile| &mut p.cache_hits,
            ))
            .build();
        let decor = Schema::<Decor>::builder("decor").build();

        Arc::new(
            Registry::builder()
                .register(player)
                .register(save_data)
                .register(profile)
                .register(decor)
                .build()
                .unwrap(),
        )
    }

    fn json_store(dir: &TempDir) -> SaveStore<JsonSerializer> {
        SaveStore::new(
            StoreConfig::with_root(dir.path()),
            registry(),
            JsonSerializer::new(),
        )
    }

    fn stores(dir: &TempDir) -> Vec<SaveStore> {
        [SaveFormat::Json, SaveFormat::Binary]
            .into_iter()
            .map(|format| {
                let config = StoreConfig {
                    format,
                    ..StoreConfig::with_root(dir.path())
                };
                SaveStore::from_config(config, registry(), Arc::default())
            })
            .collect()
    }

    // ---- whole-object mode ----

    #[test]
    fn saved_snapshot_is_isolated_from_live_object() {
        let dir = tempfile::tempdir().unwrap();
        for store in stores(&dir) {
            let mut player = Player::default();
            store.save(&player).unwrap();

            let path = store.path_for::<Player>().unwrap();
            assert!(path.exists());
            assert!(fs::metadata(&path).unwrap().len() > 0);

            player.hp += 50;
            let loaded: Player = store.load().unwrap();
            assert_eq!(loaded.hp, 100);
            assert_eq!(loaded.name, "Player");
            assert_eq!(player.hp, 150);
        }
    }

    #[test]
    fn file_name_is_key_plus_extension() {
        let dir = tempfile::tempdir().unwrap();
        let names: Vec<_> = stores(&dir)
            .iter()
            .map(|s| s.path_for::<Player>().unwrap())
            .collect();
        assert_eq!(names[0], dir.path().join("player.json"));
        assert_eq!(names[1], dir.path().join("player.bin"));
    }

    #[test]
    fn missing_file_loads_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = json_store(&dir);
        assert_eq!(store.load::<Player>().unwrap(), Player::default());
        assert!(store.try_load::<Player>().unwrap().is_none());
    }

    #[test]
    fn empty_file_loads_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = json_store(&dir);
        fs::write(store.path_for::<Player>().unwrap(), b"").unwrap();
        assert_eq!(store.load::<Player>().unwrap(), Player::default());
    }

    #[test]
    fn corrupt_file_is_a_deserialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = json_store(&dir);
        let path = store.path_for::<Player>().unwrap();
        fs::write(&path, b"{ broken").unwrap();
        match store.load::<Player>().unwrap_err() {
            StoreError::Deserialization { path: p, .. } => assert_eq!(p, path),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn save_replaces_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let store = json_store(&dir);
        let long = Player {
            name: "x".repeat(256),
            ..Player::default()
        };
        store.save(&long).unwrap();
        store.save(&Player::default()).unwrap();
        assert_eq!(store.load::<Player>().unwrap(), Player::default());
    }

    #[test]
    fn atomic_save_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = json_store(&dir);
        store.save(&Player::default()).unwrap();
        store.save(&Player::default()).unwrap();
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn atomic_save_keeps_existing_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = json_store(&dir);
        store.save(&Player::default()).unwrap();
        let path = store.path_for::<Player>().unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        store.save(&Player::default()).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }

    #[test]
    fn direct_writes_when_atomic_is_off() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig {
            atomic_writes: false,
            ..StoreConfig::with_root(dir.path())
        };
        let store = SaveStore::new(config, registry(), JsonSerializer::new());
        store.save(&Player::default()).unwrap();
        assert_eq!(store.load::<Player>().unwrap(), Player::default());
    }

    #[test]
    fn missing_root_fails_unless_created() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("nested").join("saves");

        let strict = SaveStore::new(StoreConfig::with_root(&root), registry(), JsonSerializer::new());
        assert!(matches!(
            strict.save(&Player::default()),
            Err(StoreError::Io { .. })
        ));

        let config = StoreConfig {
            create_root: true,
            ..StoreConfig::with_root(&root)
        };
        let lenient = SaveStore::new(config, registry(), JsonSerializer::new());
        lenient.save(&Player::default()).unwrap();
        assert!(root.join("player.json").exists());
    }

    #[test]
    fn unregistered_type_is_a_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = json_store(&dir);
        assert!(matches!(
            store.save(&42u32),
            Err(StoreError::Configuration(SchemaError::UnregisteredType(_)))
        ));
        assert!(store.exists::<String>().is_err());
    }

    #[test]
    fn external_reference_survives_binary_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let table = Arc::new(ObjectTableResolver::new());
        let chains = Arc::new(ResolverChains::new().with_index_resolver(Arc::clone(&table)));
        let store = SaveStore::new(
            StoreConfig::with_root(dir.path()),
            registry(),
            BincodeSerializer::new(chains),
        );

        let texture = ExternalRef::new("stone".to_string());
        store
            .save(&Decor {
                label: "wall".into(),
                texture: texture.clone(),
            })
            .unwrap();
        let loaded = store.try_load::<Decor>().unwrap().unwrap();
        assert_eq!(loaded.label, "wall");
        assert!(loaded.texture.ptr_eq(&texture));
    }

    // ---- load_into ----

    #[test]
    fn load_into_copies_properties_not_fields() {
        let dir = tempfile::tempdir().unwrap();
        let store = json_store(&dir);
        store
            .save(&Profile {
                nickname: "Ada".into(),
                level: 12,
                cache_hits: 5,
            })
            .unwrap();

        let mut existing = Profile {
            nickname: "old".into(),
            level: 1,
            cache_hits: 99,
        };
        assert!(store.load_into(&mut existing).unwrap());
        assert_eq!(existing.nickname, "Ada");
        assert_eq!(existing.level, 12);
        assert_eq!(existing.cache_hits, 99);
    }

    #[test]
    fn load_into_without_save_leaves_instance_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let store = json_store(&dir);
        let mut existing = Profile {
            nickname: "keep".into(),
            ..Profile::default()
        };
        assert!(!store.load_into(&mut existing).unwrap());
        assert_eq!(existing.nickname, "keep");
    }

    // ---- member-subset mode ----

    fn sample_save_data() -> TestSaveData {
        TestSaveData {
            level: 3,
            player_name: "Ada".into(),
            health: 87.5,
            secret: "hunter2".into(),
        }
    }

    #[test]
    fn member_round_trip_skips_untagged_members() {
        let dir = tempfile::tempdir().unwrap();
        for store in stores(&dir) {
            store.save_members(&sample_save_data()).unwrap();
            let loaded = store.load_members::<TestSaveData>().unwrap().unwrap();
            assert_eq!(loaded.level, 3);
            assert_eq!(loaded.player_name, "Ada");
            assert_eq!(loaded.health, 87.5);
            assert_eq!(loaded.secret, String::default());
        }
    }

    #[test]
    fn member_payload_uses_storage_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = json_store(&dir);
        store.save_members(&sample_save_data()).unwrap();
        let text = fs::read_to_string(store.path_for::<TestSaveData>().unwrap()).unwrap();
        assert!(text.contains("\"hp\""));
        assert!(!text.contains("Health"));
        assert!(!text.contains("hunter2"));
    }

    #[test]
    fn load_members_with_factory_keeps_factory_values() {
        let dir = tempfile::tempdir().unwrap();
        let store = json_store(&dir);
        store.save_members(&sample_save_data()).unwrap();

        let loaded = store
            .load_members_with(|| TestSaveData {
                secret: "from factory".into(),
                ..TestSaveData::default()
            })
            .unwrap()
            .unwrap();
        assert_eq!(loaded.secret, "from factory");
        assert_eq!(loaded.level, 3);
    }

    #[test]
    fn load_members_into_reports_applied_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = json_store(&dir);
        store.save_members(&sample_save_data()).unwrap();

        let mut target = TestSaveData {
            secret: "mine".into(),
            ..TestSaveData::default()
        };
        let report = store.load_members_into(&mut target).unwrap().unwrap();
        assert_eq!(report.applied, ["Level", "PlayerName", "hp"]);
        assert_eq!(target.secret, "mine");
        assert_eq!(target.player_name, "Ada");
    }

    #[test]
    fn member_loads_without_file_return_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = json_store(&dir);
        let mut factory_ran = false;
        let loaded = store
            .load_members_with(|| {
                factory_ran = true;
                TestSaveData::default()
            })
            .unwrap();
        assert!(loaded.is_none());
        assert!(!factory_ran);
        assert!(store.load_members::<TestSaveData>().unwrap().is_none());
        assert!(store
            .load_members_into(&mut TestSaveData::default())
            .unwrap()
            .is_none());
    }

    #[test]
    fn conversion_failures_follow_configured_policy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test_save_data.json");
        fs::write(&path, br#"{"Level": "high", "PlayerName": "Bo", "hp": 12}"#).unwrap();

        let lenient = json_store(&dir);
        let mut target = TestSaveData::default();
        let report = lenient.load_members_into(&mut target).unwrap().unwrap();
        assert_eq!(report.failed.len(), 1);
        assert_eq!(target.player_name, "Bo");
        assert_eq!(target.health, 12.0);

        let config = StoreConfig {
            conversion_policy: ConversionPolicy::Abort,
            ..StoreConfig::with_root(dir.path())
        };
        let strict = SaveStore::new(config, registry(), JsonSerializer::new());
        assert!(matches!(
            strict.load_members::<TestSaveData>(),
            Err(StoreError::TypeConversion(SchemaError::TypeConversion { .. }))
        ));
    }

    // ---- exists / delete ----

    #[test]
    fn exists_and_idempotent_delete() {
        let dir = tempfile::tempdir().unwrap();
        for store in stores(&dir) {
            assert!(!store.exists::<Player>().unwrap());
            store.save(&Player::default()).unwrap();
            assert!(store.exists::<Player>().unwrap());

            store.delete::<Player>().unwrap();
            assert!(!store.exists::<Player>().unwrap());
            store.delete::<Player>().unwrap();
        }
    }

    #[test]
    fn formats_use_separate_files() {
        let dir = tempfile::tempdir().unwrap();
        let stores = stores(&dir);
        stores[0].save(&Player::default()).unwrap();
        assert!(stores[0].exists::<Player>().unwrap());
        assert!(!stores[1].exists::<Player>().unwrap());
    }
}
