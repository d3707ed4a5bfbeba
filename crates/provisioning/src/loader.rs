//! Provisioning Values Loader
//!
//! Tries `nfcprovisioning.json` first, then `nfcprovisioning.txt`, then fills
//! in anything still missing from the provisioning device's own settings.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::properties::{store_properties, BUNDLE_COMMENT};
use crate::{extras, ProvisioningError, JSON_FILENAME, LOADED_FILENAME, PROPERTIES_FILENAME};

/// Provisioning extras, key -> value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ProvisioningValues {
    values: IndexMap<String, String>,
}

impl ProvisioningValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }

    /// Insert only when the key has no value yet
    pub fn put_if_missing(&mut self, key: &str, value: &str) {
        if !self.values.contains_key(key) {
            self.insert(key, value);
        }
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

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parse `key=value` lines; `#` comments and lines without '=' are skipped
    pub fn from_properties(text: &str) -> Self {
        let mut values = Self::new();
        for line in text.lines() {
            if line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            debug!("{}={}", key, value);
            values.insert(key, value);
        }
        values.gather_admin_extras();
        values
    }

    /// Parse a JSON object. Nested objects become properties text.
    pub fn from_json(json: &str) -> Result<Self, ProvisioningError> {
        let root: Value = serde_json::from_str(json)?;
        let Value::Object(map) = root else {
            return Err(ProvisioningError::NotAnObject);
        };

        let mut values = Self::new();
        for (key, value) in map {
            match value {
                Value::String(s) => values.insert(&key, &s),
                Value::Object(bundle) => {
                    let entries: IndexMap<String, String> = bundle
                        .into_iter()
                        .map(|(k, v)| (k, json_to_text(&v)))
                        .filter(|(_, v)| !v.is_empty())
                        .collect();
                    values.insert(&key, &store_properties(&entries, BUNDLE_COMMENT));
                }
                other => values.insert(&key, &json_to_text(&other)),
            }
        }
        Ok(values)
    }

    /// Move every key outside `android.app.extra*` into the admin extras bundle
    fn gather_admin_extras(&mut self) {
        let mut orphans = IndexMap::new();
        self.values.retain(|key, value| {
            if key.starts_with(extras::PREFIX) {
                true
            } else {
                orphans.insert(key.clone(), value.clone());
                false
            }
        });

        let bundle = store_properties(&orphans, BUNDLE_COMMENT);
        debug!("Admin extras bundle={}", bundle);
        self.insert(extras::ADMIN_EXTRAS_BUNDLE, &bundle);
    }

    /// Complete missing values from the provisioning device
    pub fn fill_system_defaults(&mut self, system: &SystemValues) {
        self.put_if_missing(extras::DEVICE_ADMIN_PACKAGE_NAME, &system.device_admin_package);
        if let Some(ref component) = system.device_admin_component {
            self.put_if_missing(extras::DEVICE_ADMIN_COMPONENT_NAME, component);
        }
        self.put_if_missing(extras::LOCALE, &system.locale);
        self.put_if_missing(extras::TIME_ZONE, &system.time_zone);
        if !self.contains_key(extras::WIFI_SSID) {
            if let Some(ref ssid) = system.wifi_ssid {
                self.insert(extras::WIFI_SSID, &trim_ssid(ssid));
            }
        }
    }
}

fn json_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Remove the double quotes the platform puts around SSIDs
pub fn trim_ssid(ssid: &str) -> String {
    let head = ssid.strip_prefix('"').unwrap_or(ssid);
    head.strip_suffix('"').unwrap_or(head).to_string()
}

/// Settings of the device doing the provisioning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemValues {
    pub device_admin_package: String,
    /// Only sent to devices that accept a component name
    pub device_admin_component: Option<String>,
    pub locale: String,
    pub time_zone: String,
    /// SSID of the connected network, as reported (possibly quoted)
    pub wifi_ssid: Option<String>,
}

impl Default for SystemValues {
    fn default() -> Self {
        Self {
            device_admin_package: "com.example.android.deviceowner".to_string(),
            device_admin_component: Some(
                "com.example.android.deviceowner/.DeviceOwnerReceiver".to_string(),
            ),
            locale: "en_US".to_string(),
            time_zone: "UTC".to_string(),
            wifi_ssid: None,
        }
    }
}

/// Loads provisioning values from a directory
pub struct ProvisioningValuesLoader {
    directory: PathBuf,
    system: SystemValues,
}

impl ProvisioningValuesLoader {
    pub fn new(directory: impl Into<PathBuf>, system: SystemValues) -> Self {
        Self {
            directory: directory.into(),
            system,
        }
    }

    /// Load values; unreadable files are logged and skipped
    pub async fn load(&self) -> ProvisioningValues {
        let mut values = self.load_json().await.unwrap_or_default();
        if values.is_empty() {
            values = self.load_properties().await.unwrap_or_default();
        }
        values.fill_system_defaults(&self.system);
        values
    }

    async fn load_json(&self) -> Option<ProvisioningValues> {
        let path = self.directory.join(JSON_FILENAME);
        let content = read_if_exists(&path).await?;
        match ProvisioningValues::from_json(&content) {
            Ok(mut values) => {
                values.insert(LOADED_FILENAME, &path.to_string_lossy());
                Some(values)
            }
            Err(e) => {
                debug!("Error loading JSON from {:?}: {}", path, e);
                None
            }
        }
    }

    async fn load_properties(&self) -> Option<ProvisioningValues> {
        let path = self.directory.join(PROPERTIES_FILENAME);
        let content = read_if_exists(&path).await?;
        debug!("Loading the config file...");
        let mut values = ProvisioningValues::from_properties(&content);
        values.insert(LOADED_FILENAME, &path.to_string_lossy());
        Some(values)
    }
}

async fn read_if_exists(path: &Path) -> Option<String> {
    if !path.exists() {
        return None;
    }
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Some(content),
        Err(e) => {
            warn!("Error loading data from {:?}: {}", path, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_properties_gather_admin_extras() {
        let values = ProvisioningValues::from_properties(
            "# comment\n\
             android.app.extra.PROVISIONING_LOCALE=fr_FR\n\
             no separator\n\
             custom=1\n\
             another=a=b\n",
        );

        assert_eq!(values.get(extras::LOCALE), Some("fr_FR"));
        assert!(!values.contains_key("custom"));
        assert_eq!(
            values.get(extras::ADMIN_EXTRAS_BUNDLE),
            Some("#admin extras bundle\nanother=a\\=b\ncustom=1\n")
        );
    }

    #[test]
    fn test_json_values() {
        let values = ProvisioningValues::from_json(
            r#"{
                "android.app.extra.PROVISIONING_TIME_ZONE": "Europe/Paris",
                "android.app.extra.PROVISIONING_SKIP_ENCRYPTION": true,
                "android.app.extra.PROVISIONING_ADMIN_EXTRAS_BUNDLE": {"color": "red", "empty": ""}
            }"#,
        )
        .unwrap();

        assert_eq!(values.get(extras::TIME_ZONE), Some("Europe/Paris"));
        assert_eq!(
            values.get("android.app.extra.PROVISIONING_SKIP_ENCRYPTION"),
            Some("true")
        );
        assert_eq!(
            values.get(extras::ADMIN_EXTRAS_BUNDLE),
            Some("#admin extras bundle\ncolor=red\n")
        );
    }

    #[test]
    fn test_json_must_be_object() {
        assert!(matches!(
            ProvisioningValues::from_json("[]"),
            Err(ProvisioningError::NotAnObject)
        ));
    }

    #[test]
    fn test_fill_system_defaults_keeps_existing() {
        let mut values = ProvisioningValues::new();
        values.insert(extras::LOCALE, "de_DE");

        let system = SystemValues {
            wifi_ssid: Some("\"Office\"".to_string()),
            ..SystemValues::default()
        };
        values.fill_system_defaults(&system);

        assert_eq!(values.get(extras::LOCALE), Some("de_DE"));
        assert_eq!(values.get(extras::TIME_ZONE), Some("UTC"));
        assert_eq!(values.get(extras::WIFI_SSID), Some("Office"));
        assert_eq!(
            values.get(extras::DEVICE_ADMIN_PACKAGE_NAME),
            Some("com.example.android.deviceowner")
        );
    }

    #[test]
    fn test_trim_ssid() {
        assert_eq!(trim_ssid("\"Home\""), "Home");
        assert_eq!(trim_ssid("Home"), "Home");
        assert_eq!(trim_ssid("\"Half"), "Half");
    }

    #[tokio::test]
    async fn test_loader_prefers_json() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(
            dir.path().join(JSON_FILENAME),
            r#"{"android.app.extra.PROVISIONING_LOCALE": "ja_JP"}"#,
        )
        .await
        .unwrap();
        tokio::fs::write(
            dir.path().join(PROPERTIES_FILENAME),
            "android.app.extra.PROVISIONING_LOCALE=it_IT\n",
        )
        .await
        .unwrap();

        let values = ProvisioningValuesLoader::new(dir.path(), SystemValues::default())
            .load()
            .await;
        assert_eq!(values.get(extras::LOCALE), Some("ja_JP"));
        assert!(values.get(LOADED_FILENAME).unwrap().ends_with(JSON_FILENAME));
    }

    #[tokio::test]
    async fn test_loader_falls_back_to_properties() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join(JSON_FILENAME), "not json").await.unwrap();
        tokio::fs::write(
            dir.path().join(PROPERTIES_FILENAME),
            "android.app.extra.PROVISIONING_LOCALE=it_IT\n",
        )
        .await
        .unwrap();

        let values = ProvisioningValuesLoader::new(dir.path(), SystemValues::default())
            .load()
            .await;
        assert_eq!(values.get(extras::LOCALE), Some("it_IT"));
        assert!(values.get(LOADED_FILENAME).unwrap().ends_with(PROPERTIES_FILENAME));
    }

    #[tokio::test]
    async fn test_loader_without_files_uses_system_values() {
        let dir = tempfile::tempdir().unwrap();
        let values = ProvisioningValuesLoader::new(dir.path(), SystemValues::default())
            .load()
            .await;

        assert_eq!(values.get(extras::TIME_ZONE), Some("UTC"));
        assert!(!values.contains_key(LOADED_FILENAME));
        assert!(!values.contains_key(extras::WIFI_SSID));
    }
}
