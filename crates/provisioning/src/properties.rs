//! Properties text in the `key=value` format read by the provisioned device.

use indexmap::IndexMap;

/// Header comment written before the entries
pub const BUNDLE_COMMENT: &str = "admin extras bundle";

fn escape(text: &str, is_key: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, c) in text.chars().enumerate() {
        match c {
            ' ' if is_key || i == 0 => out.push_str("\\ "),
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{c}' => out.push_str("\\f"),
            '=' | ':' | '#' | '!' => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}

pub fn escape_key(key: &str) -> String {
    escape(key, true)
}

/// Values only escape a leading space
pub fn escape_value(value: &str) -> String {
    escape(value, false)
}

/// Serialize entries sorted by key, after a `#` comment line
pub fn store_properties(entries: &IndexMap<String, String>, comment: &str) -> String {
    let mut keys: Vec<&String> = entries.keys().collect();
    keys.sort();

    let mut out = format!("#{}\n", comment);
    for key in keys {
        out.push_str(&escape_key(key));
        out.push('=');
        out.push_str(&escape_value(&entries[key]));
        out.push('\n');
    }
    out
}
