//! Provisioning Values
//!
//! Collects the extras handed to a device being provisioned as device owner:
//! values from a JSON or properties file, completed with settings of the
//! provisioning device.

pub mod properties;
pub mod loader;

pub use loader::{ProvisioningValues, ProvisioningValuesLoader, SystemValues};
pub use properties::{escape_key, escape_value, store_properties};

/// Provisioning errors
#[derive(Debug, thiserror::Error)]
pub enum ProvisioningError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Provisioning file must be a JSON object")]
    NotAnObject,
}

/// Provisioning extra keys
pub mod extras {
    pub const PREFIX: &str = "android.app.extra";
    pub const DEVICE_ADMIN_PACKAGE_NAME: &str =
        "android.app.extra.PROVISIONING_DEVICE_ADMIN_PACKAGE_NAME";
    pub const DEVICE_ADMIN_COMPONENT_NAME: &str =
        "android.app.extra.PROVISIONING_DEVICE_ADMIN_COMPONENT_NAME";
    pub const LOCALE: &str = "android.app.extra.PROVISIONING_LOCALE";
    pub const TIME_ZONE: &str = "android.app.extra.PROVISIONING_TIME_ZONE";
    pub const WIFI_SSID: &str = "android.app.extra.PROVISIONING_WIFI_SSID";
    pub const ADMIN_EXTRAS_BUNDLE: &str = "android.app.extra.PROVISIONING_ADMIN_EXTRAS_BUNDLE";
}

/// File names looked up in the provisioning directory
pub const JSON_FILENAME: &str = "nfcprovisioning.json";
pub const PROPERTIES_FILENAME: &str = "nfcprovisioning.txt";

/// Key under which the loaded file path is recorded
pub const LOADED_FILENAME: &str = " FileName";
