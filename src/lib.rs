//! managed-config - application restrictions for managed devices
//!
//! Resolves the restriction schema an application declares against the
//! values an administrator pushes, and turns the result into what a screen
//! displays.
//!
//! ## Architecture
//!
//! managed-config is organized into specialized crates:
//!
//! - `managed-config-restrictions`: schema, overrides, resolver, projector, feedback
//! - `managed-config-core`: configuration, event bus and orchestration
//! - `managed-config-provisioning`: device owner provisioning values

#![warn(clippy::all)]

pub mod commands;
pub mod sample;

// Re-export main components for library usage
pub use managed_config_core as core;
pub use managed_config_provisioning as provisioning;
pub use managed_config_restrictions as restrictions;

/// Prelude module for convenient imports
pub mod prelude {
    pub use managed_config_core::{AppConfig, Event, EventBus, Orchestrator};
    pub use managed_config_provisioning::{ProvisioningValues, ProvisioningValuesLoader};
    pub use managed_config_restrictions::{
        project, resolve, OverrideMap, OverrideValue, ProjectionFormat, ResolvedConfig,
        RestrictionSession, Schema, SchemaEntry, UiFacts,
    };
}
