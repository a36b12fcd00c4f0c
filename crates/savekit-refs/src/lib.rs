//! External object references for SaveKit.
//!
//! Some values a game or application wants to persist are not data at all:
//! textures, audio clips, scene objects and other handles owned by a host
//! subsystem. This crate lets a compact serializer write such values as small
//! [`ReferenceToken`]s and re-acquire the live objects on load.
//!
//! # Modules
//!
//! - [`handle`]: [`ExternalRef`], the shared handle to a host-owned object
//! - [`token`]: [`ReferenceToken`] (string id, guid, or table index)
//! - [`traits`]: one resolver trait per token kind
//! - [`chain`]: [`ResolverChains`], three ordered resolver lists
//! - [`scope`]: the thread-local resolution scope used while encoding
//! - [`table`]: index- and guid-table resolvers
//! - [`loader`]: [`LoaderResolver`] backed by a host [`ResourceLoader`]
//!
//! # Resolution order
//!
//! Each chain is tried in registration order and the first resolver that
//! claims (or resolves) a value wins. Encoding consults the string chain,
//! then the guid chain, then the index chain.

pub mod chain;
pub mod handle;
pub mod loader;
pub mod scope;
pub mod table;
pub mod token;
pub mod traits;

pub use chain::ResolverChains;
pub use handle::ExternalRef;
pub use loader::{LoaderResolver, ResourceLoader};
pub use table::{GuidTableResolver, ObjectTableResolver};
pub use token::ReferenceToken;
pub use traits::{GuidReferenceResolver, IndexReferenceResolver, StringReferenceResolver};
