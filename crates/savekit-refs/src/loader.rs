use tracing::{debug, warn};

use crate::handle::ExternalRef;
use crate::traits::StringReferenceResolver;

/// Host subsystem that can re-acquire a resource by its identifier.
pub trait ResourceLoader: Send + Sync {
    fn load(&self, id: &str) -> Option<ExternalRef>;
}

impl<F> ResourceLoader for F
where
    F: Fn(&str) -> Option<ExternalRef> + Send + Sync,
{
    fn load(&self, id: &str) -> Option<ExternalRef> {
        self(id)
    }
}

/// String resolver for objects that carry a resource id.
///
/// Claims any [`ExternalRef`] created with
/// [`with_resource_id`](ExternalRef::with_resource_id) and writes that id;
/// on load the id is handed to the host's [`ResourceLoader`].
pub struct LoaderResolver<L> {
    loader: L,
}

impl<L: ResourceLoader> LoaderResolver<L> {
    pub fn new(loader: L) -> Self {
        Self { loader }
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }
}

impl<L: ResourceLoader> StringReferenceResolver for LoaderResolver<L> {
    fn claim(&self, value: &ExternalRef) -> Option<String> {
        value
            .resource_id()
            .filter(|id| !id.is_empty())
            .map(str::to_owned)
    }

    fn resolve(&self, id: &str) -> Option<ExternalRef> {
        if id.is_empty() {
            return None;
        }
        let loaded = self.loader.load(id);
        match &loaded {
            Some(_) => debug!(id, "resource loaded"),
            None => warn!(id, "resource loader returned nothing"),
        }
        loaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    #[derive(Debug)]
    struct Clip(&'static str);

    fn library() -> Arc<HashMap<&'static str, ExternalRef>> {
        let mut map = HashMap::new();
        map.insert(
            "sfx/jump",
            ExternalRef::new(Clip("jump")).with_resource_id("sfx/jump"),
        );
        Arc::new(map)
    }

    #[test]
    fn claims_only_refs_with_resource_id() {
        let resolver = LoaderResolver::new(|_: &str| -> Option<ExternalRef> { None });
        let tagged = ExternalRef::new(Clip("a")).with_resource_id("sfx/a");
        assert_eq!(resolver.claim(&tagged), Some("sfx/a".to_string()));
        assert_eq!(resolver.claim(&ExternalRef::new(Clip("b"))), None);
        assert_eq!(
            resolver.claim(&ExternalRef::new(Clip("c")).with_resource_id("")),
            None
        );
    }

    #[test]
    fn resolves_through_loader() {
        let lib = library();
        let expected = lib["sfx/jump"].clone();
        let resolver = LoaderResolver::new(move |id: &str| lib.get(id).cloned());

        let loaded = resolver.resolve("sfx/jump").unwrap();
        assert!(loaded.ptr_eq(&expected));
        assert_eq!(loaded.downcast_ref::<Clip>().unwrap().0, "jump");
        assert!(resolver.resolve("sfx/missing").is_none());
        assert!(resolver.resolve("").is_none());
    }
}
