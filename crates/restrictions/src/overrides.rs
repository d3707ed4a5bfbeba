//! Override Store
//!
//! Administrator-supplied restriction values. The map is weakly typed at the
//! boundary: every accessor validates the stored type and reports a mismatch
//! as absence.

use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Serialize, Serializer};
use serde_json::Value;
use tracing::debug;

/// Override loading errors
#[derive(Debug, thiserror::Error)]
pub enum OverrideError {
    #[error("Overrides must be a JSON object, found {0}")]
    NotAnObject(&'static str),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A value as delivered by the override supplier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverrideValue {
    Bool(bool),
    Int(i64),
    Text(String),
    TextList(Vec<String>),
    Bundle(OverrideMap),
    BundleList(Vec<OverrideMap>),
}

impl OverrideValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            OverrideValue::Bool(_) => "bool",
            OverrideValue::Int(_) => "int",
            OverrideValue::Text(_) => "text",
            OverrideValue::TextList(_) => "text_list",
            OverrideValue::Bundle(_) => "bundle",
            OverrideValue::BundleList(_) => "bundle_list",
        }
    }

    /// Convert a JSON value, or `None` when it has no override representation
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(OverrideValue::Bool(*b)),
            Value::Number(n) => n.as_i64().map(OverrideValue::Int),
            Value::String(s) => Some(OverrideValue::Text(s.clone())),
            Value::Array(items) if items.is_empty() => Some(OverrideValue::TextList(Vec::new())),
            Value::Array(items) => {
                if items.iter().all(Value::is_string) {
                    let texts = items
                        .iter()
                        .filter_map(|v| v.as_str().map(str::to_string))
                        .collect();
                    Some(OverrideValue::TextList(texts))
                } else if items.iter().all(Value::is_object) {
                    let bundles = items
                        .iter()
                        .filter_map(Value::as_object)
                        .map(OverrideMap::from_json_object)
                        .collect();
                    Some(OverrideValue::BundleList(bundles))
                } else {
                    None
                }
            }
            Value::Object(map) => Some(OverrideValue::Bundle(OverrideMap::from_json_object(map))),
            Value::Null => None,
        }
    }
}

impl Serialize for OverrideValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            OverrideValue::Bool(b) => serializer.serialize_bool(*b),
            OverrideValue::Int(i) => serializer.serialize_i64(*i),
            OverrideValue::Text(s) => serializer.serialize_str(s),
            OverrideValue::TextList(items) => items.serialize(serializer),
            OverrideValue::Bundle(map) => map.serialize(serializer),
            OverrideValue::BundleList(maps) => maps.serialize(serializer),
        }
    }
}

/// Key -> value bag of administrator overrides
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideMap {
    values: IndexMap<String, OverrideValue>,
}

impl OverrideMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, builder style
    pub fn with(mut self, key: &str, value: OverrideValue) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: OverrideValue) {
        self.values.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<&OverrideValue> {
        self.values.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.values.get(key)? {
            OverrideValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.values.get(key)? {
            OverrideValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn get_text(&self, key: &str) -> Option<&str> {
        match self.values.get(key)? {
            OverrideValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn get_text_list(&self, key: &str) -> Option<&[String]> {
        match self.values.get(key)? {
            OverrideValue::TextList(items) => Some(items),
            OverrideValue::BundleList(bundles) if bundles.is_empty() => Some(&[]),
            _ => None,
        }
    }

    pub fn get_bundle_list(&self, key: &str) -> Option<&[OverrideMap]> {
        match self.values.get(key)? {
            OverrideValue::BundleList(bundles) => Some(bundles),
            OverrideValue::TextList(items) if items.is_empty() => Some(&[]),
            _ => None,
        }
    }

    /// Parse overrides from a JSON object
    pub fn from_json_str(json: &str) -> Result<Self, OverrideError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_json_value(&value)
    }

    pub fn from_json_value(value: &Value) -> Result<Self, OverrideError> {
        match value {
            Value::Object(map) => Ok(Self::from_json_object(map)),
            Value::Null => Err(OverrideError::NotAnObject("null")),
            Value::Bool(_) => Err(OverrideError::NotAnObject("bool")),
            Value::Number(_) => Err(OverrideError::NotAnObject("number")),
            Value::String(_) => Err(OverrideError::NotAnObject("string")),
            Value::Array(_) => Err(OverrideError::NotAnObject("array")),
        }
    }

    /// Load overrides from a JSON file
    pub async fn from_json_file(path: impl AsRef<Path>) -> Result<Self, OverrideError> {
        let content = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::from_json_str(&content)
    }

    fn from_json_object(map: &serde_json::Map<String, Value>) -> Self {
        let mut overrides = Self::new();
        for (key, value) in map {
            match OverrideValue::from_json(value) {
                Some(v) => overrides.insert(key, v),
                None => debug!("Dropping override '{}': unsupported value {}", key, value),
            }
        }
        overrides
    }
}

impl Serialize for OverrideMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.values.serialize(serializer)
    }
}

impl FromIterator<(String, OverrideValue)> for OverrideMap {
    fn from_iter<T: IntoIterator<Item = (String, OverrideValue)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Source of the current override snapshot, queried once per change notification
pub trait OverrideSupplier: Send + Sync {
    /// Current overrides, or `None` when the administrator supplied none
    fn application_restrictions(&self) -> Option<OverrideMap>;
}

/// Supplier holding a replaceable in-memory snapshot
#[derive(Debug, Clone, Default)]
pub struct StaticOverrides {
    current: Arc<RwLock<Option<OverrideMap>>>,
}

impl StaticOverrides {
    pub fn new(overrides: Option<OverrideMap>) -> Self {
        Self {
            current: Arc::new(RwLock::new(overrides)),
        }
    }

    /// Replace the snapshot returned by later queries
    pub fn replace(&self, overrides: Option<OverrideMap>) {
        *self.current.write() = overrides;
    }
}

impl OverrideSupplier for StaticOverrides {
    fn application_restrictions(&self) -> Option<OverrideMap> {
        self.current.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_accessors_reject_mismatch() {
        let overrides = OverrideMap::new()
            .with("can_say_hello", OverrideValue::Text("yes".into()))
            .with("number", OverrideValue::Int(7));

        assert_eq!(overrides.get_bool("can_say_hello"), None);
        assert_eq!(overrides.get_text("can_say_hello"), Some("yes"));
        assert_eq!(overrides.get_int("number"), Some(7));
        assert_eq!(overrides.get_int("missing"), None);
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "can_say_hello": false,
            "message": "Hi there",
            "number": 42,
            "approvals": ["alice", "bob"],
            "items": [{"key": "a", "value": "1"}],
            "ratio": 0.5,
            "nothing": null,
            "mixed": [1, "two"]
        }"#;
        let overrides = OverrideMap::from_json_str(json).unwrap();

        assert_eq!(overrides.get_bool("can_say_hello"), Some(false));
        assert_eq!(overrides.get_text("message"), Some("Hi there"));
        assert_eq!(overrides.get_int("number"), Some(42));
        assert_eq!(
            overrides.get_text_list("approvals"),
            Some(&["alice".to_string(), "bob".to_string()][..])
        );
        let items = overrides.get_bundle_list("items").unwrap();
        assert_eq!(items[0].get_text("key"), Some("a"));

        assert!(!overrides.contains_key("ratio"));
        assert!(!overrides.contains_key("nothing"));
        assert!(!overrides.contains_key("mixed"));
    }

    #[test]
    fn test_empty_array_serves_both_list_kinds() {
        let overrides = OverrideMap::from_json_str(r#"{"approvals": []}"#).unwrap();
        assert_eq!(overrides.get_text_list("approvals"), Some(&[] as &[String]));
        assert_eq!(overrides.get_bundle_list("approvals").map(<[_]>::len), Some(0));
    }

    #[test]
    fn test_non_object_root_rejected() {
        assert!(matches!(
            OverrideMap::from_json_str("[1, 2]"),
            Err(OverrideError::NotAnObject("array"))
        ));
    }

    #[test]
    fn test_static_supplier_replace() {
        let supplier = StaticOverrides::new(None);
        assert!(supplier.application_restrictions().is_none());

        supplier.replace(Some(OverrideMap::new().with("number", OverrideValue::Int(1))));
        let current = supplier.application_restrictions().unwrap();
        assert_eq!(current.get_int("number"), Some(1));
    }

    #[tokio::test]
    async fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overrides.json");
        tokio::fs::write(&path, r#"{"rank": "captain"}"#).await.unwrap();

        let overrides = OverrideMap::from_json_file(&path).await.unwrap();
        assert_eq!(overrides.get_text("rank"), Some("captain"));
    }
}
