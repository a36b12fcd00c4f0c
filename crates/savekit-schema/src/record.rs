use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::value::Value;

/// Ordered storage-key → [`Value`] mapping written by member-subset saves.
///
/// Entries keep insertion order. Inserting an existing key replaces its
/// value in place, so the last write wins but the key keeps its first slot.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MemberRecord {
    entries: Vec<(String, Value)>,
}

impl MemberRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace `key`, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for MemberRecord {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut record = Self::new();
        for (key, value) in iter {
            record.insert(key, value);
        }
        record
    }
}

impl IntoIterator for MemberRecord {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl Serialize for MemberRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for MemberRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(RecordVisitor)
    }
}

struct RecordVisitor;

impl<'de> Visitor<'de> for RecordVisitor {
    type Value = MemberRecord;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of member keys to values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<MemberRecord, A::Error> {
        let mut record = MemberRecord::new();
        while let Some((key, value)) = access.next_entry::<String, Value>()? {
            record.insert(key, value);
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insertion_order_is_kept() {
        let record: MemberRecord = [
            ("level", Value::Int(3)),
            ("name", Value::from("Ada")),
            ("hp", Value::Int(90)),
        ]
        .into_iter()
        .collect();
        assert_eq!(record.keys().collect::<Vec<_>>(), ["level", "name", "hp"]);
    }

    #[test]
    fn duplicate_key_overwrites_in_place() {
        let mut record = MemberRecord::new();
        record.insert("a", Value::Int(1));
        record.insert("b", Value::Int(2));
        assert_eq!(record.insert("a", Value::Int(3)), Some(Value::Int(1)));

        assert_eq!(record.len(), 2);
        assert_eq!(record.get("a"), Some(&Value::Int(3)));
        assert_eq!(record.keys().next(), Some("a"));
    }

    #[test]
    fn remove_and_lookup() {
        let mut record = MemberRecord::new();
        record.insert("a", Value::Null);
        assert!(record.contains_key("a"));
        assert_eq!(record.remove("a"), Some(Value::Null));
        assert!(record.is_empty());
        assert!(record.remove("a").is_none());
    }

    #[test]
    fn json_object_keeps_record_order() {
        let mut record = MemberRecord::new();
        record.insert("z", Value::Int(1));
        record.insert("a", Value::Bool(true));
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"z":1,"a":true}"#);

        let back: MemberRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn compact_encoding_round_trips() {
        let mut record = MemberRecord::new();
        record.insert("speed", Value::Float(2.5));
        record.insert("big", Value::UInt(u64::MAX));
        let bytes = bincode::serialize(&record).unwrap();
        let back: MemberRecord = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, record);
    }
}
