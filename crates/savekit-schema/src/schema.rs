//! Per-type member tables.
//!
//! A [`Schema`] replaces runtime reflection: each persisted type lists its
//! members once, in declaration order, as [`MemberDescriptor`]s carrying
//! typed accessors. Tagged members are the ones member-subset persistence
//! reads and writes; untagged members are still known to the schema so
//! whole-object property copies can reach them.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::convert::{decode, SaveValue};
use crate::error::{ConversionError, SchemaError, SchemaResult};
use crate::record::MemberRecord;
use crate::value::{Value, ValueKind};

type Getter<T> = Arc<dyn Fn(&T) -> Value + Send + Sync>;
type Setter<T> = Arc<dyn Fn(&mut T, &Value) -> Result<(), ConversionError> + Send + Sync>;
type Copier<T> = Arc<dyn Fn(&T, &mut T) + Send + Sync>;

/// Whether a member is stored directly or reached through accessors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemberKind {
    Field,
    Property,
}

/// What to do when a stored value cannot be converted to a member's type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionPolicy {
    /// Leave the member untouched, record the failure, keep going.
    #[default]
    SkipMember,
    /// Stop at the first failure. Members applied before it stay applied.
    Abort,
}

/// Outcome of [`Schema::apply_record`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ApplyReport {
    /// Storage keys that were written to the target.
    pub applied: Vec<String>,
    /// Tagged, writable members whose key was absent from the record.
    pub missing: Vec<String>,
    /// Members skipped because their value could not be converted.
    pub failed: Vec<SchemaError>,
}

impl ApplyReport {
    /// Returns `true` if no member failed to convert.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// One persisted member of `T`.
pub struct MemberDescriptor<T> {
    name: String,
    key: Option<String>,
    kind: MemberKind,
    tagged: bool,
    type_name: &'static str,
    value_kind: ValueKind,
    getter: Option<Getter<T>>,
    setter: Option<Setter<T>>,
    copier: Option<Copier<T>>,
}

impl<T: 'static> MemberDescriptor<T> {
    /// A stored field, reached through plain borrows.
    ///
    /// Fields take part in member-subset persistence but are never touched
    /// by [`Schema::copy_properties`].
    pub fn field<M, G, GM>(name: impl Into<String>, get: G, get_mut: GM) -> Self
    where
        M: SaveValue + 'static,
        G: Fn(&T) -> &M + Send + Sync + 'static,
        GM: Fn(&mut T) -> &mut M + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            key: None,
            kind: MemberKind::Field,
            tagged: false,
            type_name: std::any::type_name::<M>(),
            value_kind: M::KIND,
            getter: Some(Arc::new(move |target: &T| get(target).to_value())),
            setter: Some(Arc::new(move |target: &mut T, value: &Value| {
                *get_mut(target) = decode::<M>(value)?;
                Ok(())
            })),
            copier: None,
        }
    }

    /// A readable and writable property.
    pub fn property<M, G, S>(name: impl Into<String>, getter: G, setter: S) -> Self
    where
        M: SaveValue + 'static,
        G: Fn(&T) -> M + Send + Sync + 'static,
        S: Fn(&mut T, M) + Send + Sync + 'static,
    {
        let getter = Arc::new(getter);
        let setter = Arc::new(setter);
        let (copy_get, copy_set) = (Arc::clone(&getter), Arc::clone(&setter));
        Self {
            name: name.into(),
            key: None,
            kind: MemberKind::Property,
            tagged: false,
            type_name: std::any::type_name::<M>(),
            value_kind: M::KIND,
            getter: Some(Arc::new(move |target: &T| getter(target).to_value())),
            setter: Some(Arc::new(move |target: &mut T, value: &Value| {
                setter(target, decode::<M>(value)?);
                Ok(())
            })),
            copier: Some(Arc::new(move |source: &T, target: &mut T| {
                copy_set(target, copy_get(source));
            })),
        }
    }

    /// A property with no setter. Saved, never loaded.
    pub fn read_only<M, G>(name: impl Into<String>, getter: G) -> Self
    where
        M: SaveValue + 'static,
        G: Fn(&T) -> M + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            key: None,
            kind: MemberKind::Property,
            tagged: false,
            type_name: std::any::type_name::<M>(),
            value_kind: M::KIND,
            getter: Some(Arc::new(move |target: &T| getter(target).to_value())),
            setter: None,
            copier: None,
        }
    }

    /// A property with no getter. Saved as null, loaded when present.
    pub fn write_only<M, S>(name: impl Into<String>, setter: S) -> Self
    where
        M: SaveValue + 'static,
        S: Fn(&mut T, M) + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            key: None,
            kind: MemberKind::Property,
            tagged: false,
            type_name: std::any::type_name::<M>(),
            value_kind: M::KIND,
            getter: None,
            setter: Some(Arc::new(move |target: &mut T, value: &Value| {
                setter(target, decode::<M>(value)?);
                Ok(())
            })),
            copier: None,
        }
    }
}

impl<T> MemberDescriptor<T> {
    /// Store the member under `key` instead of its name.
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The override key if one was set, otherwise the member name.
    pub fn storage_key(&self) -> &str {
        self.key.as_deref().unwrap_or(&self.name)
    }

    pub fn kind(&self) -> MemberKind {
        self.kind
    }

    pub fn is_tagged(&self) -> bool {
        self.tagged
    }

    /// Rust type name of the member.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn value_kind(&self) -> ValueKind {
        self.value_kind
    }

    pub fn is_readable(&self) -> bool {
        self.getter.is_some()
    }

    pub fn is_writable(&self) -> bool {
        self.setter.is_some()
    }

    /// Current value of the member, or `None` if it has no getter.
    pub fn read(&self, target: &T) -> Option<Value> {
        self.getter.as_ref().map(|get| get(target))
    }

    /// Decode `value` into the member. Write-less members ignore the call.
    pub fn write(&self, target: &mut T, value: &Value) -> Result<(), ConversionError> {
        match &self.setter {
            Some(set) => set(target, value),
            None => Ok(()),
        }
    }
}

impl<T> fmt::Debug for MemberDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberDescriptor")
            .field("name", &self.name)
            .field("key", &self.storage_key())
            .field("kind", &self.kind)
            .field("tagged", &self.tagged)
            .field("type", &self.type_name)
            .field("readable", &self.is_readable())
            .field("writable", &self.is_writable())
            .finish()
    }
}

/// Storage key and member table for `T`.
pub struct Schema<T> {
    storage_key: String,
    type_name: &'static str,
    members: Vec<MemberDescriptor<T>>,
}

impl<T: 'static> Schema<T> {
    pub fn builder(storage_key: impl Into<String>) -> SchemaBuilder<T> {
        SchemaBuilder {
            schema: Schema {
                storage_key: storage_key.into(),
                type_name: std::any::type_name::<T>(),
                members: Vec::new(),
            },
        }
    }

    /// Key naming this type's file.
    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Every member, tagged or not, in declaration order.
    pub fn members(&self) -> &[MemberDescriptor<T>] {
        &self.members
    }

    /// Tagged members in declaration order.
    pub fn scan_tagged_members(&self) -> impl Iterator<Item = &MemberDescriptor<T>> {
        self.members.iter().filter(|m| m.tagged)
    }

    /// Read every tagged member into a record. Unreadable members are null.
    pub fn build_record(&self, source: &T) -> MemberRecord {
        let mut record = MemberRecord::new();
        for member in self.scan_tagged_members() {
            let value = member.read(source).unwrap_or(Value::Null);
            record.insert(member.storage_key(), value);
        }
        record
    }

    /// Write the record's values into the tagged members of `target`.
    ///
    /// Members whose key is absent are left alone, as are members without a
    /// setter. A null stored for a member without a getter counts as absent.
    /// Conversion failures are handled according to `policy`.
    pub fn apply_record(
        &self,
        target: &mut T,
        record: &MemberRecord,
        policy: ConversionPolicy,
    ) -> SchemaResult<ApplyReport> {
        let mut report = ApplyReport::default();
        for member in self.scan_tagged_members().filter(|m| m.is_writable()) {
            let key = member.storage_key();
            let value = match record.get(key) {
                // A write-only member is saved as null; that null carries no data.
                Some(Value::Null) if !member.is_readable() => None,
                value => value,
            };
            let Some(value) = value else {
                report.missing.push(key.to_owned());
                continue;
            };
            match member.write(target, value) {
                Ok(()) => report.applied.push(key.to_owned()),
                Err(source) => {
                    let err = SchemaError::TypeConversion {
                        member: member.name().to_owned(),
                        key: key.to_owned(),
                        source,
                    };
                    match policy {
                        ConversionPolicy::Abort => return Err(err),
                        ConversionPolicy::SkipMember => {
                            warn!(
                                storage_key = %self.storage_key,
                                member = member.name(),
                                error = %err,
                                "skipping member"
                            );
                            report.failed.push(err);
                        }
                    }
                }
            }
        }
        debug!(
            storage_key = %self.storage_key,
            applied = report.applied.len(),
            missing = report.missing.len(),
            failed = report.failed.len(),
            "record applied"
        );
        Ok(report)
    }

    /// Copy every readable and writable property from `source` to `target`.
    ///
    /// Tagging does not matter here; fields are never copied. Returns the
    /// number of properties copied.
    pub fn copy_properties(&self, source: &T, target: &mut T) -> usize {
        let mut copied = 0;
        for copy in self.members.iter().filter_map(|m| m.copier.as_ref()) {
            copy(source, target);
            copied += 1;
        }
        copied
    }
}

impl<T> fmt::Debug for Schema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("storage_key", &self.storage_key)
            .field("type", &self.type_name)
            .field("members", &self.members)
            .finish()
    }
}

/// Builder returned by [`Schema::builder`].
pub struct SchemaBuilder<T> {
    schema: Schema<T>,
}

impl<T: 'static> SchemaBuilder<T> {
    /// Add a tagged member.
    pub fn member(mut self, mut descriptor: MemberDescriptor<T>) -> Self {
        descriptor.tagged = true;
        self.schema.members.push(descriptor);
        self
    }

    /// Add a member that is known to the schema but not persisted by
    /// member-subset saves.
    pub fn untagged_member(mut self, mut descriptor: MemberDescriptor<T>) -> Self {
        descriptor.tagged = false;
        self.schema.members.push(descriptor);
        self
    }

    /// Shorthand for a tagged [`MemberDescriptor::field`].
    pub fn field<M, G, GM>(self, name: impl Into<String>, get: G, get_mut: GM) -> Self
    where
        M: SaveValue + 'static,
        G: Fn(&T) -> &M + Send + Sync + 'static,
        GM: Fn(&mut T) -> &mut M + Send + Sync + 'static,
    {
        self.member(MemberDescriptor::field(name, get, get_mut))
    }

    /// Shorthand for a tagged [`MemberDescriptor::property`].
    pub fn property<M, G, S>(self, name: impl Into<String>, getter: G, setter: S) -> Self
    where
        M: SaveValue + 'static,
        G: Fn(&T) -> M + Send + Sync + 'static,
        S: Fn(&mut T, M) + Send + Sync + 'static,
    {
        self.member(MemberDescriptor::property(name, getter, setter))
    }

    pub fn build(self) -> Schema<T> {
        self.schema
    }
}
