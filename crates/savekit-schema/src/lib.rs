//! Persistence metadata for SaveKit.
//!
//! Types opt into persistence by registering a [`Schema`]: a storage key plus
//! an ordered table of [`MemberDescriptor`]s. Tagged members take part in
//! member-subset saves, which travel as a [`MemberRecord`] of dynamic
//! [`Value`]s rather than the type's full shape.
//!
//! # Modules
//!
//! - [`value`]: [`Value`], [`ValueKind`], primitive conversions
//! - [`convert`]: [`SaveValue`], typed access to [`Value`]
//! - [`record`]: [`MemberRecord`], the ordered key/value payload
//! - [`schema`]: [`Schema`], [`MemberDescriptor`], record build/apply
//! - [`registry`]: [`Registry`], the immutable type-to-schema table
//! - [`error`]: [`SchemaError`], [`ConversionError`]

pub mod convert;
pub mod error;
pub mod record;
pub mod registry;
pub mod schema;
pub mod value;

pub use convert::SaveValue;
pub use error::{ConversionError, SchemaError, SchemaResult};
pub use record::MemberRecord;
pub use registry::{Registry, RegistryBuilder};
pub use schema::{
    ApplyReport, ConversionPolicy, MemberDescriptor, MemberKind, Schema, SchemaBuilder,
};
pub use value::{Value, ValueKind};
