//! Typed access to [`Value`].
//!
//! Every member type implements [`SaveValue`]. Primitives, strings, external
//! references and the standard containers are covered here; compound user
//! types (vectors, colours, small structs) opt in with
//! [`impl_save_value_via_serde!`](crate::impl_save_value_via_serde), which
//! routes them through their serde representation.

use std::collections::{BTreeMap, HashMap};

use savekit_refs::ExternalRef;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::error::ConversionError;
use crate::value::{Value, ValueKind};

/// A type that can be stored as a member [`Value`].
pub trait SaveValue: Sized {
    /// The kind a stored value is converted to when it does not decode as-is.
    const KIND: ValueKind;

    fn to_value(&self) -> Value;

    /// Exact decode: succeeds only if `value` already has a compatible shape.
    fn from_value(value: &Value) -> Result<Self, ConversionError>;
}

/// Decode `value` as `M`, converting primitives when the exact decode fails.
pub fn decode<M: SaveValue>(value: &Value) -> Result<M, ConversionError> {
    match M::from_value(value) {
        Ok(decoded) => Ok(decoded),
        Err(_) => M::from_value(&value.convert_to(M::KIND)?),
    }
}

macro_rules! save_signed {
    ($($t:ty),*) => {$(
        impl SaveValue for $t {
            const KIND: ValueKind = ValueKind::Int;

            fn to_value(&self) -> Value {
                Value::Int(*self as i64)
            }

            fn from_value(value: &Value) -> Result<Self, ConversionError> {
                match value {
                    Value::Int(i) => <$t>::try_from(*i)
                        .map_err(|_| ConversionError::out_of_range(i, stringify!($t))),
                    Value::UInt(u) => <$t>::try_from(*u)
                        .map_err(|_| ConversionError::out_of_range(u, stringify!($t))),
                    other => Err(ConversionError::incompatible(other.kind(), Self::KIND)),
                }
            }
        }
    )*};
}

macro_rules! save_unsigned {
    ($($t:ty),*) => {$(
        impl SaveValue for $t {
            const KIND: ValueKind = ValueKind::UInt;

            fn to_value(&self) -> Value {
                Value::UInt(*self as u64)
            }

            fn from_value(value: &Value) -> Result<Self, ConversionError> {
                match value {
                    Value::UInt(u) => <$t>::try_from(*u)
                        .map_err(|_| ConversionError::out_of_range(u, stringify!($t))),
                    Value::Int(i) => <$t>::try_from(*i)
                        .map_err(|_| ConversionError::out_of_range(i, stringify!($t))),
                    other => Err(ConversionError::incompatible(other.kind(), Self::KIND)),
                }
            }
        }
    )*};
}

macro_rules! save_float {
    ($($t:ty),*) => {$(
        impl SaveValue for $t {
            const KIND: ValueKind = ValueKind::Float;

            fn to_value(&self) -> Value {
                Value::Float(f64::from(*self))
            }

            fn from_value(value: &Value) -> Result<Self, ConversionError> {
                match value {
                    Value::Float(f) => Ok(*f as $t),
                    other => Err(ConversionError::incompatible(other.kind(), Self::KIND)),
                }
            }
        }
    )*};
}

save_signed!(i8, i16, i32, i64, isize);
save_unsigned!(u8, u16, u32, u64, usize);
save_float!(f32, f64);

impl SaveValue for bool {
    const KIND: ValueKind = ValueKind::Bool;

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Bool(b) => Ok(*b),
            other => Err(ConversionError::incompatible(other.kind(), Self::KIND)),
        }
    }
}

impl SaveValue for String {
    const KIND: ValueKind = ValueKind::String;

    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }

    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::String(s) => Ok(s.clone()),
            other => Err(ConversionError::incompatible(other.kind(), Self::KIND)),
        }
    }
}

impl SaveValue for char {
    const KIND: ValueKind = ValueKind::String;

    fn to_value(&self) -> Value {
        Value::String(self.to_string())
    }

    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        let Value::String(s) = value else {
            return Err(ConversionError::incompatible(value.kind(), Self::KIND));
        };
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(ConversionError::Parse {
                input: s.clone(),
                target: "char",
            }),
        }
    }
}

impl SaveValue for ExternalRef {
    const KIND: ValueKind = ValueKind::Reference;

    fn to_value(&self) -> Value {
        Value::Reference(self.clone())
    }

    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Reference(r) => Ok(r.clone()),
            other => Err(ConversionError::incompatible(other.kind(), Self::KIND)),
        }
    }
}

impl SaveValue for Value {
    const KIND: ValueKind = ValueKind::Any;

    fn to_value(&self) -> Value {
        self.clone()
    }

    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        Ok(value.clone())
    }
}

impl<T: SaveValue> SaveValue for Option<T> {
    const KIND: ValueKind = T::KIND;

    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, T::to_value)
    }

    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Null => Ok(None),
            other => decode::<T>(other).map(Some),
        }
    }
}

impl<T: SaveValue> SaveValue for Vec<T> {
    const KIND: ValueKind = ValueKind::List;

    fn to_value(&self) -> Value {
        Value::List(self.iter().map(T::to_value).collect())
    }

    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::List(items) => items.iter().map(decode::<T>).collect(),
            other => Err(ConversionError::incompatible(other.kind(), Self::KIND)),
        }
    }
}

impl<T: SaveValue> SaveValue for BTreeMap<String, T> {
    const KIND: ValueKind = ValueKind::Map;

    fn to_value(&self) -> Value {
        Value::Map(self.iter().map(|(k, v)| (k.clone(), v.to_value())).collect())
    }

    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Map(map) => map
                .iter()
                .map(|(k, v)| decode::<T>(v).map(|v| (k.clone(), v)))
                .collect(),
            other => Err(ConversionError::incompatible(other.kind(), Self::KIND)),
        }
    }
}

impl<T: SaveValue> SaveValue for HashMap<String, T> {
    const KIND: ValueKind = ValueKind::Map;

    fn to_value(&self) -> Value {
        Value::Map(self.iter().map(|(k, v)| (k.clone(), v.to_value())).collect())
    }

    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Map(map) => map
                .iter()
                .map(|(k, v)| decode::<T>(v).map(|v| (k.clone(), v)))
                .collect(),
            other => Err(ConversionError::incompatible(other.kind(), Self::KIND)),
        }
    }
}

/// Capture a serde type as a [`Value`] through its JSON representation.
///
/// Used by [`impl_save_value_via_serde!`](crate::impl_save_value_via_serde).
pub fn to_value_via_serde<T: Serialize>(value: &T) -> Value {
    match serde_json::to_value(value) {
        Ok(json) => Value::from(json),
        Err(err) => {
            warn!(
                type_name = std::any::type_name::<T>(),
                error = %err,
                "member value could not be captured; storing null"
            );
            Value::Null
        }
    }
}

/// Rebuild a serde type from a [`Value`] captured by [`to_value_via_serde`].
pub fn from_value_via_serde<T: DeserializeOwned>(value: &Value) -> Result<T, ConversionError> {
    serde_json::from_value(value.to_json()).map_err(|e| ConversionError::Custom(e.to_string()))
}

/// Implement [`SaveValue`] for types that implement `Serialize` and
/// `DeserializeOwned`.
///
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct Vec3 { x: f32, y: f32, z: f32 }
///
/// savekit_schema::impl_save_value_via_serde!(Vec3);
/// ```
#[macro_export]
macro_rules! impl_save_value_via_serde {
    ($($t:ty),+ $(,)?) => {$(
        impl $crate::SaveValue for $t {
            const KIND: $crate::ValueKind = $crate::ValueKind::Any;

            fn to_value(&self) -> $crate::Value {
                $crate::convert::to_value_via_serde(self)
            }

            fn from_value(
                value: &$crate::Value,
            ) -> ::core::result::Result<Self, $crate::ConversionError> {
                $crate::convert::from_value_via_serde(value)
            }
        }
    )+};
}
