//! app_restrictions.xml Parser
//!
//! Reads the restriction schema an application declares in its resources,
//! plus the string, bool, integer and string-array values its defaults
//! refer to.

use std::path::Path;

use indexmap::IndexMap;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::{debug, warn};

use crate::schema::{
    RestrictionKind, RestrictionValue, Schema, SchemaEntry, SchemaError, DEFAULT_ITEM_FIELDS,
};

/// Values from res/values/*.xml
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resources {
    strings: IndexMap<String, String>,
    /// `<bool>` and `<integer>` values, keyed `bool/name` or `integer/name`
    scalars: IndexMap<String, String>,
    string_arrays: IndexMap<String, Vec<String>>,
}

impl Resources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_string(mut self, name: &str, value: &str) -> Self {
        self.strings.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_bool(mut self, name: &str, value: bool) -> Self {
        self.scalars.insert(format!("bool/{}", name), value.to_string());
        self
    }

    pub fn with_integer(mut self, name: &str, value: i64) -> Self {
        self.scalars.insert(format!("integer/{}", name), value.to_string());
        self
    }

    pub fn with_string_array(mut self, name: &str, items: &[&str]) -> Self {
        self.string_arrays
            .insert(name.to_string(), items.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn string(&self, name: &str) -> Option<&str> {
        self.strings.get(name).map(String::as_str)
    }

    pub fn string_array(&self, name: &str) -> Option<&[String]> {
        self.string_arrays.get(name).map(Vec::as_slice)
    }

    /// Resolve `@string/`, `@bool/` or `@integer/` references; literals are returned unchanged
    pub fn resolve_text(&self, value: &str) -> Option<String> {
        let Some(reference) = value.strip_prefix('@') else {
            return Some(value.to_string());
        };
        match reference.strip_prefix("string/") {
            Some(name) => self.string(name).map(str::to_string),
            None => self.scalars.get(reference).cloned(),
        }
    }

    /// Resolve `@array/name` (or `@string-array/name`) to its items
    pub fn resolve_array(&self, value: &str) -> Option<Vec<String>> {
        let name = value
            .strip_prefix("@array/")
            .or_else(|| value.strip_prefix("@string-array/"))?;
        let items = self.string_array(name)?;
        Some(
            items
                .iter()
                .map(|item| self.resolve_text(item).unwrap_or_else(|| item.clone()))
                .collect(),
        )
    }

    /// Parse a values resource file
    pub async fn parse_file(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let content = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::parse_string(&content)
    }

    /// Parse `<resources>` XML
    pub fn parse_string(xml: &str) -> Result<Self, SchemaError> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut resources = Resources::default();
        let mut buf = Vec::new();
        // (element name, resource name, text)
        let mut current_value: Option<(&'static str, String, String)> = None;
        let mut current_array: Option<(String, Vec<String>)> = None;
        let mut current_item: Option<String> = None;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => match e.name().as_ref() {
                    b"string" | b"bool" | b"integer" => {
                        let element = match e.name().as_ref() {
                            b"bool" => "bool",
                            b"integer" => "integer",
                            _ => "string",
                        };
                        if let Some(name) = get_attr(e, "name") {
                            current_value = Some((element, name, String::new()));
                        }
                    }
                    b"string-array" | b"array" => {
                        if let Some(name) = get_attr(e, "name") {
                            current_array = Some((name, Vec::new()));
                        }
                    }
                    b"item" if current_array.is_some() => {
                        current_item = Some(String::new());
                    }
                    _ => {}
                },
                Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                    b"string" => {
                        if let Some(name) = get_attr(e, "name") {
                            resources.strings.insert(name, String::new());
                        }
                    }
                    b"item" => {
                        if let Some((_, ref mut items)) = current_array {
                            items.push(String::new());
                        }
                    }
                    b"string-array" | b"array" => {
                        if let Some(name) = get_attr(e, "name") {
                            resources.string_arrays.insert(name, Vec::new());
                        }
                    }
                    _ => {}
                },
                Ok(Event::Text(ref t)) => {
                    let text = t.unescape()?;
                    if let Some(ref mut item) = current_item {
                        item.push_str(&text);
                    } else if let Some((_, _, ref mut value)) = current_value {
                        value.push_str(&text);
                    }
                }
                Ok(Event::End(ref e)) => match e.name().as_ref() {
                    b"string" | b"bool" | b"integer" => match current_value.take() {
                        Some(("string", name, value)) => {
                            resources.strings.insert(name, unquote(&value));
                        }
                        Some((element, name, value)) => {
                            resources
                                .scalars
                                .insert(format!("{}/{}", element, name), value.trim().to_string());
                        }
                        None => {}
                    },
                    b"item" => {
                        if let (Some(item), Some((_, items))) =
                            (current_item.take(), current_array.as_mut())
                        {
                            items.push(unquote(&item));
                        }
                    }
                    b"string-array" | b"array" => {
                        if let Some((name, items)) = current_array.take() {
                            resources.string_arrays.insert(name, items);
                        }
                    }
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(SchemaError::XmlError(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(resources)
    }
}

/// Android allows wrapping a value in double quotes and escaping apostrophes
fn unquote(value: &str) -> String {
    let trimmed = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value);
    trimmed.replace("\\'", "'").replace("\\\"", "\"")
}

/// A `<restriction>` element before type conversion
#[derive(Debug, Clone, Default)]
struct RawRestriction {
    key: Option<String>,
    restriction_type: Option<String>,
    default_value: Option<String>,
    title: Option<String>,
    children: Vec<RawRestriction>,
}

/// Restriction schema parser
pub struct SchemaParser;

impl SchemaParser {
    /// Parse an app_restrictions.xml file
    pub async fn parse_file(
        path: impl AsRef<Path>,
        resources: &Resources,
    ) -> Result<Schema, SchemaError> {
        let content = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::parse_string(&content, resources)
    }

    /// Parse `<restrictions>` XML
    pub fn parse_string(xml: &str, resources: &Resources) -> Result<Schema, SchemaError> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut buf = Vec::new();
        let mut top_level: Vec<RawRestriction> = Vec::new();
        let mut stack: Vec<RawRestriction> = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) if e.name().as_ref() == b"restriction" => {
                    stack.push(Self::parse_restriction(e));
                }
                Ok(Event::Empty(ref e)) if e.name().as_ref() == b"restriction" => {
                    let raw = Self::parse_restriction(e);
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(raw),
                        None => top_level.push(raw),
                    }
                }
                Ok(Event::End(ref e)) if e.name().as_ref() == b"restriction" => {
                    if let Some(raw) = stack.pop() {
                        match stack.last_mut() {
                            Some(parent) => parent.children.push(raw),
                            None => top_level.push(raw),
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(SchemaError::XmlError(e)),
                _ => {}
            }
            buf.clear();
        }

        let mut entries = Vec::with_capacity(top_level.len());
        for raw in top_level {
            if let Some(entry) = Self::to_entry(raw, resources)? {
                debug!("Declared restriction: {} ({})", entry.key, entry.kind);
                entries.push(entry);
            }
        }

        Schema::new(entries)
    }

    fn parse_restriction(e: &BytesStart) -> RawRestriction {
        RawRestriction {
            key: get_android_attr(e, "key"),
            restriction_type: get_android_attr(e, "restrictionType"),
            default_value: get_android_attr(e, "defaultValue"),
            title: get_android_attr(e, "title"),
            children: Vec::new(),
        }
    }

    fn kind_for(restriction_type: &str) -> Option<RestrictionKind> {
        match restriction_type {
            "bool" => Some(RestrictionKind::Bool),
            "integer" => Some(RestrictionKind::Int),
            "string" | "choice" | "hidden" => Some(RestrictionKind::Text),
            "multi-select" => Some(RestrictionKind::TextList),
            "bundle_array" => Some(RestrictionKind::StructuredList),
            _ => None,
        }
    }

    fn to_entry(raw: RawRestriction, resources: &Resources) -> Result<Option<SchemaEntry>, SchemaError> {
        let key = raw.key.ok_or(SchemaError::MissingKey)?;
        let restriction_type = raw.restriction_type.unwrap_or_else(|| "string".to_string());

        let Some(kind) = Self::kind_for(&restriction_type) else {
            warn!("Skipping restriction '{}': unsupported type {}", key, restriction_type);
            return Ok(None);
        };

        let mut entry = SchemaEntry::new(&key, kind);
        entry.title = raw.title.and_then(|t| resources.resolve_text(&t));

        if let Some(default) = raw.default_value {
            entry.default = Self::parse_default(&key, kind, &default, resources)?;
        }

        if kind == RestrictionKind::StructuredList {
            entry.item_fields = raw
                .children
                .iter()
                .find(|c| c.restriction_type.as_deref() == Some("bundle"))
                .map(|bundle| bundle.children.iter().filter_map(|c| c.key.clone()).collect())
                .filter(|fields: &Vec<String>| !fields.is_empty())
                .unwrap_or_else(|| DEFAULT_ITEM_FIELDS.iter().map(|f| f.to_string()).collect());
        }

        Ok(Some(entry))
    }

    fn parse_default(
        key: &str,
        kind: RestrictionKind,
        value: &str,
        resources: &Resources,
    ) -> Result<RestrictionValue, SchemaError> {
        let invalid = || SchemaError::InvalidDefault {
            key: key.to_string(),
            value: value.to_string(),
        };

        if kind == RestrictionKind::TextList {
            return Ok(match resources.resolve_array(value) {
                Some(items) => RestrictionValue::TextList(items),
                None => {
                    warn!("Default for '{}' is not a known array: {}", key, value);
                    kind.empty_value()
                }
            });
        }

        let Some(text) = resources.resolve_text(value) else {
            warn!("Cannot resolve default for '{}': {}", key, value);
            return Ok(kind.empty_value());
        };

        match kind {
            RestrictionKind::Bool => {
                let text = text.trim();
                if text.eq_ignore_ascii_case("true") {
                    Ok(RestrictionValue::Bool(true))
                } else if text.eq_ignore_ascii_case("false") {
                    Ok(RestrictionValue::Bool(false))
                } else {
                    Err(invalid())
                }
            }
            RestrictionKind::Int => text
                .trim()
                .parse()
                .map(RestrictionValue::Int)
                .map_err(|_| invalid()),
            RestrictionKind::Text => Ok(RestrictionValue::Text(text)),
            RestrictionKind::TextList | RestrictionKind::StructuredList => Ok(kind.empty_value()),
        }
    }
}

/// Get an android: namespaced attribute
fn get_android_attr(e: &BytesStart, name: &str) -> Option<String> {
    get_attr(e, &format!("android:{}", name))
}

/// Get an attribute by its qualified name
fn get_attr(e: &BytesStart, name: &str) -> Option<String> {
    for attr in e.attributes().filter_map(|a| a.ok()) {
        if attr.key.as_ref() == name.as_bytes() {
            return attr.unescape_value().ok().map(|v| v.into_owned());
        }
    }
    None
}
