//! Error types for managed-config
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

use managed_config_restrictions::{OverrideError, SchemaError};

/// Main error type for managed-config
#[derive(Error, Debug)]
pub enum ManagedConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Override error: {0}")]
    Overrides(#[from] OverrideError),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Result type alias for managed-config operations
pub type Result<T> = std::result::Result<T, ManagedConfigError>;

impl ManagedConfigError {
    /// Check if this error is recoverable
    ///
    /// Override files are rewritten by the administrator side, so a bad read
    /// may succeed on the next change notification.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ManagedConfigError::Overrides(_) | ManagedConfigError::Io(_)
        )
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            ManagedConfigError::Io(e) => format!("File operation failed: {}", e),
            ManagedConfigError::Config(msg) => format!("Configuration error: {}", msg),
            ManagedConfigError::Schema(e) => format!("Restriction schema is invalid: {}", e),
            ManagedConfigError::Overrides(e) => format!("Managed configuration could not be read: {}", e),
            ManagedConfigError::NotFound(msg) => format!("Not found: {}", msg),
            _ => self.to_string(),
        }
    }
}
