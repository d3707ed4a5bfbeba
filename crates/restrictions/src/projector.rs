//! Presentation Projector
//!
//! Turns a resolved configuration into the small set of facts a UI shows:
//! whether a control is enabled and what text it displays.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::resolver::ResolvedConfig;
use crate::schema::{Record, RestrictionValue};

/// Separator between rendered list elements
pub const LIST_SEPARATOR: &str = ", ";

/// Substitution placeholder in label templates
pub const PLACEHOLDER: &str = "{}";

/// How one key is presented
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlFormat {
    /// Boolean flag: enabled state plus one phrase per state
    Toggle { on: String, off: String },
    /// Any value rendered into a template with one `{}` placeholder
    Label { template: String },
}

impl ControlFormat {
    pub fn toggle(on: &str, off: &str) -> Self {
        ControlFormat::Toggle {
            on: on.to_string(),
            off: off.to_string(),
        }
    }

    pub fn label(template: &str) -> Self {
        ControlFormat::Label {
            template: template.to_string(),
        }
    }
}

/// Caller-supplied formatting configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionFormat {
    /// Text shown for a list with no elements
    pub none_placeholder: String,
    /// Keys with a UI affordance
    pub controls: IndexMap<String, ControlFormat>,
}

impl Default for ProjectionFormat {
    fn default() -> Self {
        Self {
            none_placeholder: "none".to_string(),
            controls: IndexMap::new(),
        }
    }
}

impl ProjectionFormat {
    /// Add a control, builder style
    pub fn with_control(mut self, key: &str, format: ControlFormat) -> Self {
        self.controls.insert(key.to_string(), format);
        self
    }

    /// Render a value as plain text, without any template
    pub fn render_value(&self, value: &RestrictionValue) -> String {
        match value {
            RestrictionValue::Bool(b) => b.to_string(),
            RestrictionValue::Int(i) => i.to_string(),
            RestrictionValue::Text(s) => s.clone(),
            RestrictionValue::TextList(items) => items.join(LIST_SEPARATOR),
            RestrictionValue::StructuredList(records) => records
                .iter()
                .map(render_record)
                .collect::<Vec<_>>()
                .join(LIST_SEPARATOR),
            RestrictionValue::None => self.none_placeholder.clone(),
        }
    }
}

/// Rendered element of a structured list: field values joined with ':'
fn render_record(record: &Record) -> String {
    record.values().map(String::as_str).collect::<Vec<_>>().join(":")
}

/// Replace the first placeholder of `template` with `value`
pub fn fill_template(template: &str, value: &str) -> String {
    template.replacen(PLACEHOLDER, value, 1)
}

/// What a single control shows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiFact {
    pub enabled: bool,
    pub display_text: String,
}

/// Facts for every key with a UI affordance, in schema order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UiFacts {
    facts: IndexMap<String, UiFact>,
}

impl UiFacts {
    pub fn get(&self, key: &str) -> Option<&UiFact> {
        self.facts.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &UiFact)> {
        self.facts.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// Facts that are new or differ from `previous`
    pub fn changed_since<'a>(&'a self, previous: &UiFacts) -> Vec<(&'a str, &'a UiFact)> {
        self.iter()
            .filter(|(key, fact)| previous.get(key) != Some(*fact))
            .collect()
    }
}

/// Project a resolved configuration into UI facts
pub fn project(config: &ResolvedConfig, format: &ProjectionFormat) -> UiFacts {
    let mut facts = IndexMap::new();

    for (key, value) in config.iter() {
        let Some(control) = format.controls.get(key) else {
            continue;
        };

        let fact = match (control, value) {
            (ControlFormat::Toggle { on, off }, RestrictionValue::Bool(flag)) => UiFact {
                enabled: *flag,
                display_text: if *flag { on.clone() } else { off.clone() },
            },
            // A toggle bound to a non-boolean key shows the raw value
            (ControlFormat::Toggle { .. }, other) => UiFact {
                enabled: true,
                display_text: format.render_value(other),
            },
            (ControlFormat::Label { template }, value) => UiFact {
                enabled: true,
                display_text: fill_template(template, &format.render_value(value)),
            },
        };

        facts.insert(key.to_string(), fact);
    }

    UiFacts { facts }
}
