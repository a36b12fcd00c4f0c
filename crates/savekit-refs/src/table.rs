//! Table-backed resolvers.
//!
//! [`ObjectTableResolver`] writes every claimed object into a table and
//! stores its position. The table is the sidecar the host persists (or
//! rebuilds) next to the payload, so the same table must be in place when
//! the payload is decoded.
//!
//! [`GuidTableResolver`] maps host-assigned guids to objects.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use tracing::debug;
use uuid::Uuid;

use crate::handle::ExternalRef;
use crate::traits::{GuidReferenceResolver, IndexReferenceResolver};

/// Index resolver over an append-only object table.
///
/// Claims are appended as the encoder reaches each reference and are not
/// undone if the encode later fails. A host that keeps the table across
/// saves records [`len`](Self::len) before encoding and passes it to
/// [`truncate`](Self::truncate) when the save fails.
#[derive(Debug, Default)]
pub struct ObjectTableResolver {
    objects: Mutex<Vec<ExternalRef>>,
    accepts: Option<TypeId>,
}

impl ObjectTableResolver {
    /// Create a resolver that claims objects of any type.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a resolver that only claims objects of type `T`.
    pub fn for_type<T: Any>() -> Self {
        Self {
            objects: Mutex::new(Vec::new()),
            accepts: Some(TypeId::of::<T>()),
        }
    }

    /// Create a resolver seeded with a table restored by the host.
    pub fn from_objects(objects: Vec<ExternalRef>) -> Self {
        Self {
            objects: Mutex::new(objects),
            accepts: None,
        }
    }

    /// Snapshot of the current table.
    pub fn objects(&self) -> Vec<ExternalRef> {
        self.objects.lock().expect("lock poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.objects.lock().expect("lock poisoned").clear();
    }

    /// Drop every entry at or after `len`. No-op if the table is shorter.
    pub fn truncate(&self, len: usize) {
        self.objects.lock().expect("lock poisoned").truncate(len);
    }
}

impl IndexReferenceResolver for ObjectTableResolver {
    fn claim(&self, value: &ExternalRef) -> Option<u32> {
        if self.accepts.is_some_and(|t| t != value.object_type_id()) {
            return None;
        }
        let mut objects = self.objects.lock().expect("lock poisoned");
        // An index that does not fit the token cannot be resolved later.
        let index = u32::try_from(objects.len()).ok()?;
        objects.push(value.clone());
        debug!(index, type_name = value.type_name(), "object table claim");
        Some(index)
    }

    fn resolve(&self, index: u32) -> Option<ExternalRef> {
        let objects = self.objects.lock().expect("lock poisoned");
        objects.get(index as usize).cloned()
    }
}

/// Guid resolver over an explicit guid-to-object table.
#[derive(Debug, Default)]
pub struct GuidTableResolver {
    entries: RwLock<HashMap<Uuid, ExternalRef>>,
}

impl GuidTableResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `guid` to `object`, replacing any previous binding.
    pub fn register(&self, guid: Uuid, object: ExternalRef) {
        self.entries
            .write()
            .expect("lock poisoned")
            .insert(guid, object);
    }

    /// Bind `object` to a freshly generated guid and return it.
    pub fn register_new(&self, object: ExternalRef) -> Uuid {
        let guid = Uuid::new_v4();
        self.register(guid, object);
        guid
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl GuidReferenceResolver for GuidTableResolver {
    fn claim(&self, value: &ExternalRef) -> Option<Uuid> {
        let entries = self.entries.read().expect("lock poisoned");
        entries
            .iter()
            .find(|(_, object)| object.ptr_eq(value))
            .map(|(guid, _)| *guid)
    }

    fn resolve(&self, guid: &Uuid) -> Option<ExternalRef> {
        self.entries.read().expect("lock poisoned").get(guid).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ResolverChains;
    use crate::scope;
    use proptest::prelude::*;
    use std::sync::Arc;

    #[derive(Debug)]
    struct Mesh(u32);

    #[test]
    fn claim_returns_length_before_push() {
        let table = ObjectTableResolver::new();
        let a = ExternalRef::new(Mesh(1));
        let b = ExternalRef::new(Mesh(2));

        assert_eq!(table.claim(&a), Some(0));
        assert_eq!(table.claim(&b), Some(1));
        assert_eq!(table.len(), 2);
        assert!(table.resolve(1).unwrap().ptr_eq(&b));
    }

    #[test]
    fn resolve_out_of_range_declines() {
        let table = ObjectTableResolver::new();
        assert!(table.resolve(0).is_none());
        table.claim(&ExternalRef::new(Mesh(0)));
        assert!(table.resolve(1).is_none());
    }

    #[test]
    fn type_filter_declines_other_types() {
        let table = ObjectTableResolver::for_type::<Mesh>();
        assert_eq!(table.claim(&ExternalRef::new(7u32)), None);
        assert_eq!(table.claim(&ExternalRef::new(Mesh(7))), Some(0));
    }

    #[test]
    fn seeded_table_resolves_restored_objects() {
        let a = ExternalRef::new(Mesh(1));
        let table = ObjectTableResolver::from_objects(vec![a.clone()]);
        assert!(table.resolve(0).unwrap().ptr_eq(&a));

        table.clear();
        assert!(table.is_empty());
    }

    #[test]
    fn failed_encode_can_be_rolled_back() {
        let table = Arc::new(ObjectTableResolver::for_type::<Mesh>());
        let chains = Arc::new(ResolverChains::new().with_index_resolver(Arc::clone(&table)));
        let refs = vec![ExternalRef::new(Mesh(1)), ExternalRef::new(7u32)];

        let mark = table.len();
        let encoded = scope::with_chains(&chains, || bincode::serialize(&refs));
        assert!(encoded.is_err());
        assert_eq!(table.len(), 1);

        table.truncate(mark);
        assert!(table.is_empty());
        table.truncate(5);
        assert!(table.is_empty());
    }

    #[test]
    fn guid_table_claims_registered_objects_only() {
        let table = GuidTableResolver::new();
        let known = ExternalRef::new(Mesh(1));
        let guid = table.register_new(known.clone());

        assert_eq!(table.claim(&known), Some(guid));
        assert_eq!(table.claim(&ExternalRef::new(Mesh(1))), None);
        assert!(table.resolve(&guid).unwrap().ptr_eq(&known));
        assert!(table.resolve(&Uuid::new_v4()).is_none());
        assert_eq!(table.len(), 1);
    }

    proptest! {
        #[test]
        fn every_claimed_index_resolves_to_its_object(count in 1usize..64) {
            let table = ObjectTableResolver::new();
            let handles: Vec<_> = (0..count).map(ExternalRef::new).collect();

            for (expected, handle) in handles.iter().enumerate() {
                let before = table.len();
                let index = table.claim(handle).unwrap();
                prop_assert_eq!(index as usize, before);
                prop_assert_eq!(index as usize, expected);
            }
            for (index, handle) in handles.iter().enumerate() {
                prop_assert!(table.resolve(index as u32).unwrap().ptr_eq(handle));
            }
        }
    }
}
