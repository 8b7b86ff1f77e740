//! Semi-structured record over a JSON object.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::hash::{Hash, Hasher};

use crate::error::{ErrorCode, JoinError};

/// One submission or output row: a JSON object with dotted-path access
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Wrap a JSON value, which must be an object
    pub fn from_value(value: Value) -> Result<Self, JoinError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(JoinError::storage_with_code(
                ErrorCode::STORAGE_DESERIALIZATION_ERROR,
                format!("Expected a JSON object record, found {}", kind_of(&other)),
                None,
            )),
        }
    }

    /// Look up a value by dotted field path (`a.b.c`)
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.0.get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Scalar value at `path` rendered as text; `None` for absent, null or nested values
    pub fn text(&self, path: &str) -> Option<String> {
        match self.get(path)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Set a top-level field
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(field.into(), value.into());
    }

    /// Remove a value by dotted field path, in place
    pub fn remove(&mut self, path: &str) -> Option<Value> {
        match path.rsplit_once('.') {
            None => self.0.remove(path),
            Some((parent, leaf)) => {
                let mut segments = parent.split('.');
                let first = segments.next()?;
                let mut current = self.0.get_mut(first)?;
                for segment in segments {
                    current = current.as_object_mut()?.get_mut(segment)?;
                }
                current.as_object_mut()?.remove(leaf)
            }
        }
    }

    /// Array stored under `field`, created empty when absent or not an array
    pub fn array_mut(&mut self, field: &str) -> &mut Vec<Value> {
        let slot = self
            .0
            .entry(field.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if !slot.is_array() {
            *slot = Value::Array(Vec::new());
        }
        match slot {
            Value::Array(items) => items,
            _ => unreachable!("slot was just made an array"),
        }
    }

    /// Copy every field of `other` that this record does not already hold
    pub fn merge_missing(&mut self, other: &Record) {
        for (field, value) in other.fields() {
            if !self.0.contains_key(field) {
                self.0.insert(field.clone(), value.clone());
            }
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Compact JSON with sorted keys; equal records share one canonical form
    pub fn canonical(&self) -> String {
        canonical_value(&Value::Object(self.0.clone()))
    }
}

/// Compact JSON rendering of a value; object keys come out sorted
pub fn canonical_value(value: &Value) -> String {
    value.to_string()
}

impl Hash for Record {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_map(&self.0, state);
    }
}

fn hash_map<H: Hasher>(map: &Map<String, Value>, state: &mut H) {
    map.len().hash(state);
    for (field, value) in map {
        field.hash(state);
        hash_value(value, state);
    }
}

fn hash_value<H: Hasher>(value: &Value, state: &mut H) {
    match value {
        Value::Null => 0u8.hash(state),
        Value::Bool(b) => {
            1u8.hash(state);
            b.hash(state);
        }
        Value::Number(n) => {
            2u8.hash(state);
            n.to_string().hash(state);
        }
        Value::String(s) => {
            3u8.hash(state);
            s.hash(state);
        }
        Value::Array(items) => {
            4u8.hash(state);
            items.len().hash(state);
            for item in items {
                hash_value(item, state);
            }
        }
        Value::Object(map) => {
            5u8.hash(state);
            hash_map(map, state);
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Record {
    type Error = JoinError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Record::from_value(value)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        record.into_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    fn record(value: Value) -> Record {
        Record::from_value(value).unwrap()
    }

    #[test]
    fn test_dotted_path_access() {
        let r = record(json!({"a": {"b": {"c": 7}}, "name": "TP53", "flag": null}));

        assert_eq!(r.get("a.b.c"), Some(&json!(7)));
        assert_eq!(r.text("a.b.c").as_deref(), Some("7"));
        assert_eq!(r.text("name").as_deref(), Some("TP53"));
        assert_eq!(r.text("flag"), None);
        assert_eq!(r.text("a.b"), None);
        assert!(r.get("a.x.c").is_none());
    }

    #[test]
    fn test_remove_nested_leaves_siblings() {
        let mut r = record(json!({"a": {"b": 1, "c": 2}, "d": 3}));

        assert_eq!(r.remove("a.b"), Some(json!(1)));
        assert_eq!(r.remove("a.b"), None);
        assert_eq!(r.remove("missing.path"), None);
        assert_eq!(r.into_value(), json!({"a": {"c": 2}, "d": 3}));
    }

    #[test]
    fn test_array_mut_creates_and_replaces() {
        let mut r = record(json!({"consequence": "broken"}));
        r.array_mut("consequence").push(json!({"gene": "TP53"}));
        r.array_mut("consequence").push(json!({"gene": "KRAS"}));

        assert_eq!(
            r.get("consequence"),
            Some(&json!([{"gene": "TP53"}, {"gene": "KRAS"}]))
        );
    }

    #[test]
    fn test_equal_records_hash_alike() {
        let a = record(json!({"x": 1, "y": [1, {"z": "q"}]}));
        let b = record(json!({"y": [1, {"z": "q"}], "x": 1}));
        let c = record(json!({"x": 2, "y": [1, {"z": "q"}]}));

        let set: HashSet<Record> = [a.clone(), b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert!(set.contains(&a));
        assert_eq!(a.canonical(), r#"{"x":1,"y":[1,{"z":"q"}]}"#);
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(Record::from_value(json!([1, 2])).is_err());
    }
}
