//! Restriction Schema
//!
//! The fixed set of configuration keys an application declares, each with a
//! type and a default value.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One element of a structured list: field name -> text value, in source order
pub type Record = IndexMap<String, String>;

/// Fields every structured-list element needs when the schema names none
pub const DEFAULT_ITEM_FIELDS: [&str; 2] = ["key", "value"];

/// Schema errors
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Schema declares no restrictions")]
    Empty,
    #[error("Duplicate restriction key: {0}")]
    DuplicateKey(String),
    #[error("Default for '{key}' is {actual}, expected {expected}")]
    DefaultMismatch {
        key: String,
        expected: RestrictionKind,
        actual: &'static str,
    },
    #[error("Restriction without android:key")]
    MissingKey,
    #[error("Invalid default for '{key}': {value}")]
    InvalidDefault { key: String, value: String },
    #[error("XML parsing error: {0}")]
    XmlError(#[from] quick_xml::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Declared type of a restriction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestrictionKind {
    Bool,
    Int,
    Text,
    TextList,
    StructuredList,
}

impl RestrictionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RestrictionKind::Bool => "bool",
            RestrictionKind::Int => "int",
            RestrictionKind::Text => "text",
            RestrictionKind::TextList => "text_list",
            RestrictionKind::StructuredList => "structured_list",
        }
    }

    /// Value used when neither the schema nor the overrides provide one
    pub fn empty_value(&self) -> RestrictionValue {
        match self {
            RestrictionKind::Bool => RestrictionValue::Bool(false),
            RestrictionKind::Int => RestrictionValue::Int(0),
            RestrictionKind::Text => RestrictionValue::Text(String::new()),
            RestrictionKind::TextList | RestrictionKind::StructuredList => RestrictionValue::None,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, RestrictionKind::TextList | RestrictionKind::StructuredList)
    }
}

impl fmt::Display for RestrictionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A concrete restriction value, as declared by a default or produced by resolution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RestrictionValue {
    Bool(bool),
    Int(i64),
    Text(String),
    TextList(Vec<String>),
    StructuredList(Vec<Record>),
    /// A list kind with zero elements
    #[default]
    None,
}

impl RestrictionValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            RestrictionValue::Bool(_) => "bool",
            RestrictionValue::Int(_) => "int",
            RestrictionValue::Text(_) => "text",
            RestrictionValue::TextList(_) => "text_list",
            RestrictionValue::StructuredList(_) => "structured_list",
            RestrictionValue::None => "none",
        }
    }

    /// Whether this value may stand for a restriction of `kind`
    pub fn matches(&self, kind: RestrictionKind) -> bool {
        match (self, kind) {
            (RestrictionValue::Bool(_), RestrictionKind::Bool)
            | (RestrictionValue::Int(_), RestrictionKind::Int)
            | (RestrictionValue::Text(_), RestrictionKind::Text)
            | (RestrictionValue::TextList(_), RestrictionKind::TextList)
            | (RestrictionValue::StructuredList(_), RestrictionKind::StructuredList) => true,
            (RestrictionValue::None, kind) => kind.is_list(),
            _ => false,
        }
    }

    /// Collapse empty lists into the `None` sentinel
    pub fn normalized(self) -> Self {
        match self {
            RestrictionValue::TextList(items) if items.is_empty() => RestrictionValue::None,
            RestrictionValue::StructuredList(items) if items.is_empty() => RestrictionValue::None,
            other => other,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, RestrictionValue::None)
    }
}

/// A single named restriction declared by the application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaEntry {
    /// Unique key (e.g., "can_say_hello")
    pub key: String,

    /// Declared type
    pub kind: RestrictionKind,

    /// Default value, used when no well-typed override is present
    #[serde(default)]
    pub default: RestrictionValue,

    /// Required fields of each element (structured lists only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub item_fields: Vec<String>,

    /// Human readable title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl SchemaEntry {
    /// Create an entry with the kind's empty default
    pub fn new(key: &str, kind: RestrictionKind) -> Self {
        let item_fields = if kind == RestrictionKind::StructuredList {
            DEFAULT_ITEM_FIELDS.iter().map(|f| f.to_string()).collect()
        } else {
            Vec::new()
        };

        Self {
            key: key.to_string(),
            kind,
            default: kind.empty_value(),
            item_fields,
            title: None,
        }
    }

    pub fn bool(key: &str, default: bool) -> Self {
        Self::new(key, RestrictionKind::Bool).with_default(RestrictionValue::Bool(default))
    }

    pub fn int(key: &str, default: i64) -> Self {
        Self::new(key, RestrictionKind::Int).with_default(RestrictionValue::Int(default))
    }

    pub fn text(key: &str, default: &str) -> Self {
        Self::new(key, RestrictionKind::Text).with_default(RestrictionValue::Text(default.to_string()))
    }

    pub fn text_list(key: &str, default: &[&str]) -> Self {
        let items = default.iter().map(|s| s.to_string()).collect();
        Self::new(key, RestrictionKind::TextList).with_default(RestrictionValue::TextList(items))
    }

    pub fn structured_list(key: &str) -> Self {
        Self::new(key, RestrictionKind::StructuredList)
    }

    /// Set the default value
    pub fn with_default(mut self, default: RestrictionValue) -> Self {
        self.default = default;
        self
    }

    /// Set the required element fields
    pub fn with_item_fields(mut self, fields: &[&str]) -> Self {
        self.item_fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    /// Set the title
    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }
}

/// Validated, read-only list of schema entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<SchemaEntry>", into = "Vec<SchemaEntry>")]
pub struct Schema {
    entries: Vec<SchemaEntry>,
}

impl Schema {
    /// Build a schema, rejecting empty input, duplicate keys and mistyped defaults
    pub fn new(entries: Vec<SchemaEntry>) -> Result<Self, SchemaError> {
        if entries.is_empty() {
            return Err(SchemaError::Empty);
        }

        let mut seen = std::collections::HashSet::new();
        let mut validated = Vec::with_capacity(entries.len());

        for mut entry in entries {
            if !seen.insert(entry.key.clone()) {
                return Err(SchemaError::DuplicateKey(entry.key));
            }

            // A missing default deserializes as the sentinel
            if entry.default.is_none() && !entry.kind.is_list() {
                entry.default = entry.kind.empty_value();
            }
            if entry.kind == RestrictionKind::StructuredList && entry.item_fields.is_empty() {
                entry.item_fields = DEFAULT_ITEM_FIELDS.iter().map(|f| f.to_string()).collect();
            }

            // Default elements obey the same required fields as overrides
            if let RestrictionValue::StructuredList(ref mut records) = entry.default {
                let fields = &entry.item_fields;
                let declared = records.len();
                records.retain(|record| fields.iter().all(|f| record.contains_key(f)));
                if records.len() < declared {
                    warn!(
                        "Dropped {} incomplete default element(s) of '{}'",
                        declared - records.len(),
                        entry.key
                    );
                }
            }
            entry.default = entry.default.normalized();

            if !entry.default.matches(entry.kind) {
                return Err(SchemaError::DefaultMismatch {
                    key: entry.key,
                    expected: entry.kind,
                    actual: entry.default.type_name(),
                });
            }

            validated.push(entry);
        }

        Ok(Self { entries: validated })
    }

    pub fn entries(&self) -> &[SchemaEntry] {
        &self.entries
    }

    pub fn get(&self, key: &str) -> Option<&SchemaEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TryFrom<Vec<SchemaEntry>> for Schema {
    type Error = SchemaError;

    fn try_from(entries: Vec<SchemaEntry>) -> Result<Self, Self::Error> {
        Schema::new(entries)
    }
}

impl From<Schema> for Vec<SchemaEntry> {
    fn from(schema: Schema) -> Self {
        schema.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_schema() {
        assert!(matches!(Schema::new(vec![]), Err(SchemaError::Empty)));
    }

    #[test]
    fn test_rejects_duplicate_keys() {
        let result = Schema::new(vec![
            SchemaEntry::bool("can_say_hello", true),
            SchemaEntry::bool("can_say_hello", false),
        ]);
        assert!(matches!(result, Err(SchemaError::DuplicateKey(k)) if k == "can_say_hello"));
    }

    #[test]
    fn test_rejects_mistyped_default() {
        let entry = SchemaEntry::new("number", RestrictionKind::Int)
            .with_default(RestrictionValue::Text("ten".into()));
        assert!(matches!(
            Schema::new(vec![entry]),
            Err(SchemaError::DefaultMismatch { .. })
        ));
    }

    #[test]
    fn test_empty_list_default_becomes_none() {
        let schema = Schema::new(vec![SchemaEntry::text_list("approvals", &[])]).unwrap();
        assert_eq!(schema.get("approvals").unwrap().default, RestrictionValue::None);
    }

    #[test]
    fn test_structured_list_gets_default_fields() {
        let mut entry = SchemaEntry::structured_list("items");
        entry.item_fields.clear();
        let schema = Schema::new(vec![entry]).unwrap();
        assert_eq!(schema.get("items").unwrap().item_fields, vec!["key", "value"]);
    }

    #[test]
    fn test_schema_from_json() {
        let json = r#"[
            {"key": "can_say_hello", "kind": "bool", "default": true},
            {"key": "number", "kind": "int"},
            {"key": "approvals", "kind": "text_list", "default": ["alice"]}
        ]"#;
        let schema: Schema = serde_json::from_str(json).unwrap();

        assert_eq!(schema.len(), 3);
        assert_eq!(schema.get("number").unwrap().default, RestrictionValue::Int(0));
        assert_eq!(
            schema.get("approvals").unwrap().default,
            RestrictionValue::TextList(vec!["alice".into()])
        );
    }

    #[test]
    fn test_incomplete_default_elements_are_dropped() {
        let json = r#"[
            {"key": "items", "kind": "structured_list",
             "default": [{"key": "a"}, {"key": "b", "value": "2"}]},
            {"key": "others", "kind": "structured_list", "default": [{"value": "1"}]}
        ]"#;
        let schema: Schema = serde_json::from_str(json).unwrap();

        let RestrictionValue::StructuredList(ref records) = schema.get("items").unwrap().default
        else {
            panic!("expected a structured list default");
        };
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("key").map(String::as_str), Some("b"));
        assert_eq!(schema.get("others").unwrap().default, RestrictionValue::None);

        let format = crate::projector::ProjectionFormat::default()
            .with_control("items", crate::projector::ControlFormat::label("{}"));
        let facts = crate::projector::project(&crate::resolver::resolve(&schema, None), &format);
        assert_eq!(facts.get("items").unwrap().display_text, "b:2");
    }

    #[test]
    fn test_schema_from_json_with_duplicates_fails() {
        let json = r#"[
            {"key": "a", "kind": "bool"},
            {"key": "a", "kind": "int"}
        ]"#;
        assert!(serde_json::from_str::<Schema>(json).is_err());
    }
}
