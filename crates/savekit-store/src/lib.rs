//! Save stores for SaveKit.
//!
//! A store maps each registered type to one file under a writable root and
//! persists it either whole, through serde, or as the subset of members its
//! [`Schema`] tags. [`SaveStore`] blocks; [`AsyncSaveStore`] runs on tokio.
//! Both share a [`StoreContext`] and behave identically.

pub mod async_store;
pub mod config;
pub mod context;
pub mod error;
pub mod path;
pub mod store;

pub use async_store::AsyncSaveStore;
pub use config::StoreConfig;
pub use context::StoreContext;
pub use error::{StoreError, StoreResult};
pub use path::PathResolver;
pub use store::SaveStore;

// Re-export key types
pub use savekit_codec::{
    BincodeSerializer, FormatSerializer, JsonSerializer, SaveFormat, Serializer,
};
pub use savekit_refs::{ExternalRef, ReferenceToken, ResolverChains};
pub use savekit_schema::{
    ApplyReport, ConversionPolicy, MemberDescriptor, MemberRecord, Registry, SaveValue, Schema,
    Value,
};
