//! Payload serializers for SaveKit.
//!
//! A [`Serializer`] turns a value (a whole object or a member record) into
//! bytes and back, and names the file extension its payloads use. Two
//! implementations ship:
//!
//! - [`JsonSerializer`]: indented JSON, `.json`. External references are
//!   written as `null`; the referenced object is never traversed.
//! - [`BincodeSerializer`]: bincode, `.bin`. External references are
//!   replaced by tokens from its [`ResolverChains`](savekit_refs::ResolverChains).
//!
//! [`FormatSerializer`] picks one of them from a [`SaveFormat`].

pub mod binary;
pub mod error;
pub mod format;
pub mod json;
pub mod serializer;

pub use binary::BincodeSerializer;
pub use error::{CodecError, CodecResult};
pub use format::{FormatSerializer, SaveFormat};
pub use json::JsonSerializer;
pub use serializer::Serializer;
