//! Dynamic member values.
//!
//! A [`Value`] is what a member looks like inside a
//! [`MemberRecord`](crate::MemberRecord): independent of the member's Rust
//! type, so a record written by one version of a type can be applied to
//! another.
//!
//! Human-readable formats see a natural encoding (JSON scalars, arrays,
//! objects). Compact formats see a tagged enum, which lets them decode a
//! record without knowing its shape up front.

use std::collections::BTreeMap;
use std::fmt;

use savekit_refs::ExternalRef;
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ConversionError;

/// The shape of a [`Value`], or the shape a member expects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    Int,
    UInt,
    Float,
    String,
    Bytes,
    List,
    Map,
    Reference,
    /// Accepts any shape; used by members that decode structurally.
    Any,
}

impl ValueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::UInt => "uint",
            Self::Float => "float",
            Self::String => "string",
            Self::Bytes => "bytes",
            Self::List => "list",
            Self::Map => "map",
            Self::Reference => "reference",
            Self::Any => "any",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dynamically typed member value.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Reference(ExternalRef),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Null => ValueKind::Null,
            Self::Bool(_) => ValueKind::Bool,
            Self::Int(_) => ValueKind::Int,
            Self::UInt(_) => ValueKind::UInt,
            Self::Float(_) => ValueKind::Float,
            Self::String(_) => ValueKind::String,
            Self::Bytes(_) => ValueKind::Bytes,
            Self::List(_) => ValueKind::List,
            Self::Map(_) => ValueKind::Map,
            Self::Reference(_) => ValueKind::Reference,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Convert a primitive value to another primitive kind.
    ///
    /// Numbers widen and narrow with range checks; floats become integers by
    /// rounding half to even. Strings parse to and format from every
    /// primitive, and booleans map to `0`/`1`. Lists, maps, bytes and
    /// references only convert to their own kind (or to [`ValueKind::Any`]).
    pub fn convert_to(&self, target: ValueKind) -> Result<Value, ConversionError> {
        if target == ValueKind::Any || self.kind() == target {
            return Ok(self.clone());
        }
        match (target, self) {
            (ValueKind::Bool, Self::Int(i)) => Ok(Self::Bool(*i != 0)),
            (ValueKind::Bool, Self::UInt(u)) => Ok(Self::Bool(*u != 0)),
            (ValueKind::Bool, Self::Float(f)) => Ok(Self::Bool(*f != 0.0)),
            (ValueKind::Bool, Self::String(s)) => parse_bool(s).map(Self::Bool),

            (ValueKind::Int, Self::Bool(b)) => Ok(Self::Int(i64::from(*b))),
            (ValueKind::Int, Self::UInt(u)) => i64::try_from(*u)
                .map(Self::Int)
                .map_err(|_| ConversionError::out_of_range(u, "i64")),
            (ValueKind::Int, Self::Float(f)) => float_to_i64(*f).map(Self::Int),
            (ValueKind::Int, Self::String(s)) => parse_i64(s).map(Self::Int),

            (ValueKind::UInt, Self::Bool(b)) => Ok(Self::UInt(u64::from(*b))),
            (ValueKind::UInt, Self::Int(i)) => u64::try_from(*i)
                .map(Self::UInt)
                .map_err(|_| ConversionError::out_of_range(i, "u64")),
            (ValueKind::UInt, Self::Float(f)) => float_to_u64(*f).map(Self::UInt),
            (ValueKind::UInt, Self::String(s)) => parse_u64(s).map(Self::UInt),

            (ValueKind::Float, Self::Bool(b)) => Ok(Self::Float(if *b { 1.0 } else { 0.0 })),
            (ValueKind::Float, Self::Int(i)) => Ok(Self::Float(*i as f64)),
            (ValueKind::Float, Self::UInt(u)) => Ok(Self::Float(*u as f64)),
            (ValueKind::Float, Self::String(s)) => parse_f64(s).map(Self::Float),

            (ValueKind::String, Self::Bool(b)) => Ok(Self::String(b.to_string())),
            (ValueKind::String, Self::Int(i)) => Ok(Self::String(i.to_string())),
            (ValueKind::String, Self::UInt(u)) => Ok(Self::String(u.to_string())),
            (ValueKind::String, Self::Float(f)) => Ok(Self::String(f.to_string())),

            _ => Err(ConversionError::incompatible(self.kind(), target)),
        }
    }

    /// JSON view of the value. References have no JSON form and become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Self::Null | Self::Reference(_) => Json::Null,
            Self::Bool(b) => Json::Bool(*b),
            Self::Int(i) => Json::from(*i),
            Self::UInt(u) => Json::from(*u),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Self::String(s) => Json::String(s.clone()),
            Self::Bytes(bytes) => Json::Array(bytes.iter().map(|b| Json::from(*b)).collect()),
            Self::List(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Self::Map(map) => Json::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

fn parse_bool(s: &str) -> Result<bool, ConversionError> {
    let trimmed = s.trim();
    if trimmed.eq_ignore_ascii_case("true") || trimmed == "1" {
        Ok(true)
    } else if trimmed.eq_ignore_ascii_case("false") || trimmed == "0" {
        Ok(false)
    } else {
        Err(parse_error(s, "bool"))
    }
}

fn parse_i64(s: &str) -> Result<i64, ConversionError> {
    let trimmed = s.trim();
    match trimmed.parse::<i64>() {
        Ok(i) => Ok(i),
        Err(_) => float_to_i64(parse_f64(trimmed).map_err(|_| parse_error(s, "i64"))?),
    }
}

fn parse_u64(s: &str) -> Result<u64, ConversionError> {
    let trimmed = s.trim();
    match trimmed.parse::<u64>() {
        Ok(u) => Ok(u),
        Err(_) => float_to_u64(parse_f64(trimmed).map_err(|_| parse_error(s, "u64"))?),
    }
}

fn parse_f64(s: &str) -> Result<f64, ConversionError> {
    s.trim().parse::<f64>().map_err(|_| parse_error(s, "f64"))
}

fn parse_error(input: &str, target: &'static str) -> ConversionError {
    ConversionError::Parse {
        input: input.to_owned(),
        target,
    }
}

// 2^63 and 2^64 are exactly representable, so `>=` rejects everything that
// would saturate in the `as` cast.
fn float_to_i64(f: f64) -> Result<i64, ConversionError> {
    let rounded = f.round_ties_even();
    if !rounded.is_finite() || rounded < i64::MIN as f64 || rounded >= i64::MAX as f64 {
        return Err(ConversionError::out_of_range(f, "i64"));
    }
    Ok(rounded as i64)
}

fn float_to_u64(f: f64) -> Result<u64, ConversionError> {
    let rounded = f.round_ties_even();
    if !rounded.is_finite() || rounded < 0.0 || rounded >= u64::MAX as f64 {
        return Err(ConversionError::out_of_range(f, "u64"));
    }
    Ok(rounded as u64)
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match json {
            Json::Null => Self::Null,
            Json::Bool(b) => Self::Bool(b),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Self::UInt(u)
                } else {
                    Self::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Json::String(s) => Self::String(s),
            Json::Array(items) => Self::List(items.into_iter().map(Value::from).collect()),
            Json::Object(map) => {
                Self::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<ExternalRef> for Value {
    fn from(r: ExternalRef) -> Self {
        Self::Reference(r)
    }
}

// ---- serde ----------------------------------------------------------------

/// Borrowed compact encoding. Variant order is the wire format and must
/// match [`Tagged`].
#[derive(Serialize)]
#[serde(rename = "Value")]
enum TaggedRef<'a> {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(&'a str),
    Bytes(&'a [u8]),
    List(&'a [Value]),
    Map(&'a BTreeMap<String, Value>),
    Reference(&'a ExternalRef),
}

#[derive(Deserialize)]
#[serde(rename = "Value")]
enum Tagged {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Reference(ExternalRef),
}

impl<'a> From<&'a Value> for TaggedRef<'a> {
    fn from(value: &'a Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Int(i) => Self::Int(*i),
            Value::UInt(u) => Self::UInt(*u),
            Value::Float(f) => Self::Float(*f),
            Value::String(s) => Self::String(s),
            Value::Bytes(b) => Self::Bytes(b),
            Value::List(items) => Self::List(items),
            Value::Map(map) => Self::Map(map),
            Value::Reference(r) => Self::Reference(r),
        }
    }
}

impl From<Tagged> for Value {
    fn from(tagged: Tagged) -> Self {
        match tagged {
            Tagged::Null => Self::Null,
            Tagged::Bool(b) => Self::Bool(b),
            Tagged::Int(i) => Self::Int(i),
            Tagged::UInt(u) => Self::UInt(u),
            Tagged::Float(f) => Self::Float(f),
            Tagged::String(s) => Self::String(s),
            Tagged::Bytes(b) => Self::Bytes(b),
            Tagged::List(items) => Self::List(items),
            Tagged::Map(map) => Self::Map(map),
            Tagged::Reference(r) => Self::Reference(r),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if !serializer.is_human_readable() {
            return TaggedRef::from(self).serialize(serializer);
        }
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::UInt(u) => serializer.serialize_u64(*u),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::String(s) => serializer.serialize_str(s),
            Self::Bytes(b) => serializer.serialize_bytes(b),
            Self::List(items) => serializer.collect_seq(items),
            Self::Map(map) => serializer.collect_map(map),
            Self::Reference(r) => r.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            deserializer.deserialize_any(ValueVisitor)
        } else {
            Tagged::deserialize(deserializer).map(Value::from)
        }
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any member value")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        Value::deserialize(deserializer)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Int(v))
    }

    // Text formats do not distinguish signedness; keep what fits as Int.
    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        Ok(i64::try_from(v).map_or(Value::UInt(v), Value::Int))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Ok(Value::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::String(v.to_owned()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Value, E> {
        Ok(Value::Bytes(v.to_vec()))
    }

    fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<Value, E> {
        Ok(Value::Bytes(v))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::List(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Value, A::Error> {
        let mut map = BTreeMap::new();
        while let Some((key, value)) = access.next_entry::<String, Value>()? {
            map.insert(key, value);
        }
        Ok(Value::Map(map))
    }
}
