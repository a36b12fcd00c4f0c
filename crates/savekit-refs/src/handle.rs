use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use serde::de::Error as _;
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::scope;
use crate::token::ReferenceToken;

/// Shared handle to an object owned by the host (an asset, a scene node,
/// anything that cannot or should not be serialized by value).
///
/// Cloning is cheap and equality is identity: two handles are equal when
/// they point at the same allocation.
///
/// `ExternalRef` implements serde traits, but only a serializer that runs
/// inside a resolution [`scope`] can write it meaningfully. With resolvers
/// in scope it is written as `Some(token)`; without them it is written as
/// `None`, i.e. the branch is dropped instead of traversed.
#[derive(Clone)]
pub struct ExternalRef {
    object: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
    resource_id: Option<Arc<str>>,
}

impl ExternalRef {
    /// Wrap an owned object in a new shared handle.
    pub fn new<T: Any + Send + Sync>(object: T) -> Self {
        Self::from_arc(Arc::new(object))
    }

    /// Wrap an already shared object.
    pub fn from_arc<T: Any + Send + Sync>(object: Arc<T>) -> Self {
        Self {
            object,
            type_name: std::any::type_name::<T>(),
            resource_id: None,
        }
    }

    /// Attach the identifier the host's resource loader knows this object by.
    pub fn with_resource_id(mut self, id: impl Into<Arc<str>>) -> Self {
        self.resource_id = Some(id.into());
        self
    }

    /// Identifier attached with [`Self::with_resource_id`], if any.
    pub fn resource_id(&self) -> Option<&str> {
        self.resource_id.as_deref()
    }

    /// Name of the concrete type behind the handle.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// `TypeId` of the concrete type behind the handle.
    pub fn object_type_id(&self) -> TypeId {
        self.object.as_ref().type_id()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.object.as_ref().is::<T>()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.object.as_ref().downcast_ref::<T>()
    }

    /// Recover a typed `Arc` sharing ownership with this handle.
    pub fn downcast_arc<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.object).downcast::<T>().ok()
    }

    /// Returns `true` if both handles point at the same object.
    pub fn ptr_eq(&self, other: &ExternalRef) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.object) as *const (),
            Arc::as_ptr(&other.object) as *const (),
        )
    }
}

impl PartialEq for ExternalRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for ExternalRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("ExternalRef");
        s.field("type", &self.type_name);
        if let Some(id) = &self.resource_id {
            s.field("resource_id", id);
        }
        s.finish()
    }
}

impl Serialize for ExternalRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match scope::active() {
            Some(chains) => {
                let token = chains.claim(self).ok_or_else(|| {
                    S::Error::custom(format!(
                        "no resolver claimed external reference to {}",
                        self.type_name
                    ))
                })?;
                serializer.serialize_some(&token)
            }
            None => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for ExternalRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let Some(token) = Option::<ReferenceToken>::deserialize(deserializer)? else {
            return Err(D::Error::custom(
                "external reference was not persisted by this format",
            ));
        };
        let chains = scope::active().ok_or_else(|| {
            D::Error::custom(format!("no reference resolvers in scope for {token}"))
        })?;
        chains
            .resolve(&token)
            .ok_or_else(|| D::Error::custom(format!("no resolver could resolve {token}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Texture {
        name: &'static str,
    }

    #[test]
    fn clones_share_identity() {
        let a = ExternalRef::new(Texture { name: "grass" });
        let b = a.clone();
        let c = ExternalRef::new(Texture { name: "grass" });
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn downcast_to_concrete_type() {
        let handle = ExternalRef::new(Texture { name: "stone" });
        assert!(handle.is::<Texture>());
        assert!(!handle.is::<String>());
        assert_eq!(handle.downcast_ref::<Texture>().unwrap().name, "stone");
        let arc = handle.downcast_arc::<Texture>().unwrap();
        assert_eq!(arc.name, "stone");
        assert!(handle.downcast_arc::<u32>().is_none());
    }

    #[test]
    fn object_type_id_is_the_inner_type() {
        let handle = ExternalRef::new(5u64);
        assert_eq!(handle.object_type_id(), TypeId::of::<u64>());
    }

    #[test]
    fn resource_id_is_optional() {
        let plain = ExternalRef::new(1u8);
        assert!(plain.resource_id().is_none());
        let named = plain.with_resource_id("sfx/jump");
        assert_eq!(named.resource_id(), Some("sfx/jump"));
        assert!(format!("{named:?}").contains("sfx/jump"));
    }

    #[test]
    fn outside_a_scope_the_branch_is_dropped() {
        let handle = ExternalRef::new(Texture { name: "sky" });
        let json = serde_json::to_string(&handle).unwrap();
        assert_eq!(json, "null");

        let err = serde_json::from_str::<ExternalRef>("null").unwrap_err();
        assert!(err.to_string().contains("not persisted"));
    }
}
