//! Application Configuration
//!
//! Settings that are not part of the restriction schema:
//! - how resolved values are displayed
//! - which keys report enterprise feedback
//! - where the schema, resources and overrides live

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use managed_config_restrictions::{
    keys, ControlFormat, FeedbackChannel, OverrideMap, ProjectionFormat, Resources,
    RestrictionSession, Schema, SchemaParser, Severity,
};

use crate::error::{ManagedConfigError, Result};

/// Control formats keyed by restriction key, in display order
pub type Controls = IndexMap<String, ControlFormat>;

/// Display configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DisplayConfig {
    /// Text shown for lists without elements
    pub none_placeholder: String,
    /// Template for the hello message, one `{}` placeholder
    pub message_template: String,
    /// Per-key controls
    pub controls: Controls,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        let mut controls = Controls::new();
        controls.insert(
            keys::CAN_SAY_HELLO.to_string(),
            ControlFormat::toggle(
                "I can say hello to you.",
                "I am restricted from saying hello to you.",
            ),
        );
        controls.insert(keys::NUMBER.to_string(), ControlFormat::label("Your number: {}"));
        controls.insert(keys::RANK.to_string(), ControlFormat::label("Your rank: {}"));
        controls.insert(
            keys::APPROVALS.to_string(),
            ControlFormat::label("Approvals you have: {}"),
        );
        controls.insert(keys::ITEMS.to_string(), ControlFormat::label("Your items: {}"));

        Self {
            none_placeholder: "none".to_string(),
            message_template: "{}".to_string(),
            controls,
        }
    }
}

impl DisplayConfig {
    pub fn projection_format(&self) -> ProjectionFormat {
        ProjectionFormat {
            none_placeholder: self.none_placeholder.clone(),
            controls: self.controls.clone(),
        }
    }
}

/// Enterprise feedback configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FeedbackConfig {
    /// Send keyed app states after each resolution
    pub enabled: bool,
    /// Severity attached to every state
    pub severity: Severity,
    /// Keys whose resolved value is reported
    pub monitored_keys: Vec<String>,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            severity: Severity::Error,
            monitored_keys: vec![keys::CAN_SAY_HELLO.to_string(), keys::MESSAGE.to_string()],
        }
    }
}

/// Input locations
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SourcesConfig {
    /// app_restrictions.xml
    pub schema: Option<PathBuf>,
    /// res/values file with the strings and arrays the schema refers to
    pub resources: Option<PathBuf>,
    /// JSON file with the current administrator overrides
    pub overrides: Option<PathBuf>,
}

impl SourcesConfig {
    /// Parse the configured schema with its resources
    pub async fn load_schema(&self) -> Result<Schema> {
        let path = self
            .schema
            .as_ref()
            .ok_or_else(|| ManagedConfigError::NotFound("no restriction schema configured".into()))?;

        let resources = match self.resources {
            Some(ref values) => Resources::parse_file(values).await?,
            None => Resources::new(),
        };

        info!("Loading restriction schema from {:?}", path);
        Ok(SchemaParser::parse_file(path, &resources).await?)
    }

    /// Read the current overrides; a missing file means no overrides
    pub async fn load_overrides(&self) -> Result<Option<OverrideMap>> {
        let Some(ref path) = self.overrides else {
            return Ok(None);
        };
        if !path.exists() {
            debug!("Overrides file {:?} does not exist", path);
            return Ok(None);
        }
        Ok(Some(OverrideMap::from_json_file(path).await?))
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    /// Configuration version for migrations
    pub version: u32,
    pub display: DisplayConfig,
    pub feedback: FeedbackConfig,
    pub sources: SourcesConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: 1,
            display: DisplayConfig::default(),
            feedback: FeedbackConfig::default(),
            sources: SourcesConfig::default(),
        }
    }
}

impl AppConfig {
    /// Get the configuration directory path
    pub fn config_dir() -> Option<PathBuf> {
        ProjectDirs::from("com", "example", "managed-config")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the configuration file path
    pub fn config_file() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Load configuration from the default location, falling back to defaults
    pub async fn load() -> Result<Self> {
        let config_file = Self::config_file()
            .ok_or_else(|| ManagedConfigError::Config("Cannot determine config path".into()))?;

        if config_file.exists() {
            Self::load_from(&config_file).await
        } else {
            info!("Config file not found, using defaults");
            Ok(AppConfig::default())
        }
    }

    /// Load configuration from a specific file
    pub async fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        debug!("Loading config from {:?}", path.as_ref());
        let contents = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        Ok(config)
    }

    /// Save configuration to a specific file
    pub async fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        // Ensure directory exists
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let contents = toml::to_string_pretty(self)?;
        tokio::fs::write(path, contents).await?;

        debug!("Config saved to {:?}", path);
        Ok(())
    }

    /// Build a session for `schema` wired to this configuration
    pub fn session(&self, schema: Schema, feedback: Box<dyn FeedbackChannel>) -> RestrictionSession {
        let session = RestrictionSession::new(schema, self.display.projection_format())
            .with_message_template(&self.display.message_template);

        if self.feedback.enabled {
            session.with_feedback(
                feedback,
                self.feedback.monitored_keys.clone(),
                self.feedback.severity,
            )
        } else {
            session
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use managed_config_restrictions::{QueuedFeedback, SchemaEntry};

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.display.none_placeholder, "none");
        assert_eq!(config.display.controls.len(), 5);
        assert!(config.feedback.enabled);
        assert_eq!(config.feedback.severity, Severity::Error);
    }

    #[test]
    fn test_toml_round_trip_keeps_controls() {
        let config = AppConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed = AppConfig::from_toml(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [display]
            none_placeholder = "nothing"

            [display.controls.number]
            type = "label"
            template = "N={}"

            [feedback]
            enabled = false
            "#,
        )
        .unwrap();

        assert_eq!(config.display.none_placeholder, "nothing");
        assert_eq!(config.display.controls.len(), 1);
        assert_eq!(config.display.message_template, "{}");
        assert!(!config.feedback.enabled);
        assert_eq!(config.feedback.monitored_keys.len(), 2);
    }

    #[test]
    fn test_session_without_feedback() {
        let mut config = AppConfig::default();
        config.feedback.enabled = false;
        let (channel, receiver) = QueuedFeedback::new();

        let schema = Schema::new(vec![SchemaEntry::bool(keys::CAN_SAY_HELLO, true)]).unwrap();
        let mut session = config.session(schema, Box::new(channel));
        let update = session.on_restrictions_changed(None);

        assert_eq!(
            update.facts.get(keys::CAN_SAY_HELLO).unwrap().display_text,
            "I can say hello to you."
        );
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_sources() {
        let dir = tempfile::tempdir().unwrap();
        let schema_path = dir.path().join("app_restrictions.xml");
        let values_path = dir.path().join("strings.xml");
        let overrides_path = dir.path().join("overrides.json");

        tokio::fs::write(
            &schema_path,
            r#"<restrictions xmlns:android="http://schemas.android.com/apk/res/android">
                <restriction android:key="message" android:restrictionType="string"
                    android:defaultValue="@string/default_message"/>
            </restrictions>"#,
        )
        .await
        .unwrap();
        tokio::fs::write(
            &values_path,
            r#"<resources><string name="default_message">Hello!</string></resources>"#,
        )
        .await
        .unwrap();

        let sources = SourcesConfig {
            schema: Some(schema_path),
            resources: Some(values_path),
            overrides: Some(overrides_path.clone()),
        };

        let schema = sources.load_schema().await.unwrap();
        assert_eq!(
            schema.get(keys::MESSAGE).unwrap().default,
            managed_config_restrictions::RestrictionValue::Text("Hello!".into())
        );
        assert!(sources.load_overrides().await.unwrap().is_none());

        tokio::fs::write(&overrides_path, r#"{"message": "Hi"}"#).await.unwrap();
        let overrides = sources.load_overrides().await.unwrap().unwrap();
        assert_eq!(overrides.get_text(keys::MESSAGE), Some("Hi"));

        tokio::fs::write(&overrides_path, "[1, 2]").await.unwrap();
        let err = sources.load_overrides().await.unwrap_err();
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn test_schema_not_configured() {
        let err = SourcesConfig::default().load_schema().await.unwrap_err();
        assert!(matches!(err, ManagedConfigError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = AppConfig::default();
        config.sources.schema = Some(PathBuf::from("res/xml/app_restrictions.xml"));
        config.save_to(&path).await.unwrap();

        let loaded = AppConfig::load_from(&path).await.unwrap();
        assert_eq!(loaded, config);
    }
}
