use std::any::{Any, TypeId};
use std::collections::HashMap;

use tracing::debug;

use crate::error::{SchemaError, SchemaResult};
use crate::schema::Schema;

struct Entry {
    storage_key: String,
    type_name: &'static str,
    schema: Box<dyn Any + Send + Sync>,
}

/// Immutable table of every persisted type's [`Schema`].
///
/// Built once with [`Registry::builder`] and shared (usually behind an
/// `Arc`) by every store. Storage keys are unique across types.
pub struct Registry {
    entries: HashMap<TypeId, Entry>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Storage key of `T`.
    pub fn storage_key<T: 'static>(&self) -> SchemaResult<&str> {
        self.entry(TypeId::of::<T>(), std::any::type_name::<T>())
            .map(|e| e.storage_key.as_str())
    }

    /// Storage key of the type identified by `type_id`.
    pub fn storage_key_of(&self, type_id: TypeId) -> SchemaResult<&str> {
        self.entries
            .get(&type_id)
            .map(|e| e.storage_key.as_str())
            .ok_or_else(|| SchemaError::UnregisteredType(format!("{type_id:?}")))
    }

    /// Storage key of the concrete type behind `value`.
    pub fn storage_key_of_val(&self, value: &dyn Any) -> SchemaResult<&str> {
        self.storage_key_of(value.type_id())
    }

    pub fn schema<T: 'static>(&self) -> SchemaResult<&Schema<T>> {
        let type_name = std::any::type_name::<T>();
        self.entry(TypeId::of::<T>(), type_name)?
            .schema
            .downcast_ref::<Schema<T>>()
            .ok_or_else(|| SchemaError::UnregisteredType(type_name.to_owned()))
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered storage keys, sorted.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<_> = self.entries.values().map(|e| e.storage_key.as_str()).collect();
        keys.sort_unstable();
        keys
    }

    fn entry(&self, type_id: TypeId, type_name: &str) -> SchemaResult<&Entry> {
        self.entries
            .get(&type_id)
            .ok_or_else(|| SchemaError::UnregisteredType(type_name.to_owned()))
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<_> = self
            .entries
            .values()
            .map(|e| (e.storage_key.as_str(), e.type_name))
            .collect();
        types.sort_unstable();
        f.debug_struct("Registry").field("types", &types).finish()
    }
}

/// Collects schemas and validates them into a [`Registry`].
#[derive(Default)]
pub struct RegistryBuilder {
    pending: Vec<(TypeId, Entry)>,
}

impl RegistryBuilder {
    pub fn register<T: 'static>(mut self, schema: Schema<T>) -> Self {
        self.pending.push((
            TypeId::of::<T>(),
            Entry {
                storage_key: schema.storage_key().to_owned(),
                type_name: schema.type_name(),
                schema: Box::new(schema),
            },
        ));
        self
    }

    /// Validate and freeze the registry.
    ///
    /// Fails on an empty storage key, a type registered twice, or two types
    /// sharing a storage key.
    pub fn build(self) -> SchemaResult<Registry> {
        let mut entries: HashMap<TypeId, Entry> = HashMap::with_capacity(self.pending.len());
        let mut owners: HashMap<String, &'static str> = HashMap::new();

        for (type_id, entry) in self.pending {
            if entry.storage_key.is_empty() {
                return Err(SchemaError::EmptyStorageKey(entry.type_name.to_owned()));
            }
            if entries.contains_key(&type_id) {
                return Err(SchemaError::DuplicateType(entry.type_name.to_owned()));
            }
            if let Some(first) = owners.get(&entry.storage_key) {
                return Err(SchemaError::DuplicateStorageKey {
                    key: entry.storage_key,
                    first: (*first).to_owned(),
                    second: entry.type_name.to_owned(),
                });
            }
            owners.insert(entry.storage_key.clone(), entry.type_name);
            entries.insert(type_id, entry);
        }

        debug!(types = entries.len(), "schema registry built");
        Ok(Registry { entries })
    }
}
