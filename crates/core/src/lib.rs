//! managed-config core - configuration, events and orchestration
//!
//! Wires the restriction resolver to the outside world: the TOML application
//! config, the change-notification bus and the orchestrator that reacts to it.

pub mod orchestrator;
pub mod config;
pub mod events;
pub mod error;

pub use orchestrator::{Orchestrator, OrchestratorState};
pub use config::{AppConfig, DisplayConfig, FeedbackConfig, SourcesConfig};
pub use events::{Event, EventBus, EventFeedback, EventSubscription};
pub use error::{ManagedConfigError, Result};

/// managed-config version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "managed-config";
