//! Restriction Resolver
//!
//! Merges schema defaults with administrator overrides into one concrete value
//! per schema key. Resolution never fails: a missing or mistyped override
//! falls back to the default.

use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use crate::overrides::{OverrideMap, OverrideValue};
use crate::schema::{Record, RestrictionKind, RestrictionValue, Schema, SchemaEntry};

/// Where a resolved value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// No override for the key
    Default,
    /// Well-typed override
    Override,
    /// Override present with the wrong type; default used
    Mistyped,
}

/// Per-key provenance of a resolution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionReport {
    sources: IndexMap<String, Source>,
    skipped_items: IndexMap<String, usize>,
}

impl ResolutionReport {
    pub fn source(&self, key: &str) -> Option<Source> {
        self.sources.get(key).copied()
    }

    /// Keys whose override was present but mistyped
    pub fn mistyped(&self) -> impl Iterator<Item = &str> {
        self.sources
            .iter()
            .filter(|(_, s)| **s == Source::Mistyped)
            .map(|(k, _)| k.as_str())
    }

    /// Number of structured-list elements dropped for missing fields
    pub fn skipped_items(&self, key: &str) -> usize {
        self.skipped_items.get(key).copied().unwrap_or(0)
    }
}

/// One resolved value per schema key, in schema order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ResolvedConfig {
    values: IndexMap<String, RestrictionValue>,
}

impl ResolvedConfig {
    pub fn get(&self, key: &str) -> Option<&RestrictionValue> {
        self.values.get(key)
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        match self.values.get(key)? {
            RestrictionValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        match self.values.get(key)? {
            RestrictionValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.values.get(key)? {
            RestrictionValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Text list elements; empty for the `None` sentinel
    pub fn text_list(&self, key: &str) -> Option<&[String]> {
        match self.values.get(key)? {
            RestrictionValue::TextList(items) => Some(items),
            RestrictionValue::None => Some(&[]),
            _ => None,
        }
    }

    /// Structured list elements; empty for the `None` sentinel
    pub fn records(&self, key: &str) -> Option<&[Record]> {
        match self.values.get(key)? {
            RestrictionValue::StructuredList(items) => Some(items),
            RestrictionValue::None => Some(&[]),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RestrictionValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Resolve every schema entry against the overrides
pub fn resolve(schema: &Schema, overrides: Option<&OverrideMap>) -> ResolvedConfig {
    resolve_with_report(schema, overrides).0
}

/// Resolve and also report where each value came from
pub fn resolve_with_report(
    schema: &Schema,
    overrides: Option<&OverrideMap>,
) -> (ResolvedConfig, ResolutionReport) {
    let mut values = IndexMap::with_capacity(schema.len());
    let mut report = ResolutionReport::default();

    for entry in schema.entries() {
        let (value, source, skipped) = resolve_entry(entry, overrides);

        match source {
            Source::Mistyped => debug!(
                "key: {} mistyped override ({}), using default",
                entry.key,
                overrides
                    .and_then(|o| o.get(&entry.key))
                    .map(|v| v.type_name())
                    .unwrap_or("?")
            ),
            _ => debug!("key: {} from {:?}", entry.key, source),
        }

        if skipped > 0 {
            debug!("key: {} skipped {} incomplete item(s)", entry.key, skipped);
            report.skipped_items.insert(entry.key.clone(), skipped);
        }
        report.sources.insert(entry.key.clone(), source);
        values.insert(entry.key.clone(), value);
    }

    (ResolvedConfig { values }, report)
}

fn resolve_entry(
    entry: &SchemaEntry,
    overrides: Option<&OverrideMap>,
) -> (RestrictionValue, Source, usize) {
    let Some(overrides) = overrides.filter(|o| o.contains_key(&entry.key)) else {
        return (entry.default.clone(), Source::Default, 0);
    };
    let key = entry.key.as_str();

    let mut skipped = 0;
    let value = match entry.kind {
        RestrictionKind::Bool => overrides.get_bool(key).map(RestrictionValue::Bool),
        RestrictionKind::Int => overrides.get_int(key).map(RestrictionValue::Int),
        RestrictionKind::Text => overrides
            .get_text(key)
            .map(|s| RestrictionValue::Text(s.to_string())),
        RestrictionKind::TextList => overrides
            .get_text_list(key)
            .map(|items| RestrictionValue::TextList(items.to_vec())),
        RestrictionKind::StructuredList => overrides.get_bundle_list(key).map(|bundles| {
            let mut records = Vec::with_capacity(bundles.len());
            for bundle in bundles {
                match to_record(bundle, &entry.item_fields) {
                    Some(record) => records.push(record),
                    None => skipped += 1,
                }
            }
            RestrictionValue::StructuredList(records)
        }),
    };

    match value {
        Some(v) => (v.normalized(), Source::Override, skipped),
        None => (entry.default.clone(), Source::Mistyped, 0),
    }
}

/// Keep an element only if every required field is present as a scalar.
/// Integer and boolean fields are kept in their text form.
fn to_record(bundle: &OverrideMap, fields: &[String]) -> Option<Record> {
    fields
        .iter()
        .map(|field| {
            let text = match bundle.get(field)? {
                OverrideValue::Text(s) => s.clone(),
                OverrideValue::Int(i) => i.to_string(),
                OverrideValue::Bool(b) => b.to_string(),
                _ => return None,
            };
            Some((field.clone(), text))
        })
        .collect()
}
