//! Managed Configuration Restrictions
//!
//! Resolves an application's declared restriction schema against the values
//! an administrator pushes, and projects the result into UI facts.

pub mod schema;
pub mod parser;
pub mod overrides;
pub mod resolver;
pub mod projector;
pub mod feedback;
pub mod session;

pub use schema::{Record, RestrictionKind, RestrictionValue, Schema, SchemaEntry, SchemaError};
pub use parser::{Resources, SchemaParser};
pub use overrides::{OverrideError, OverrideMap, OverrideSupplier, OverrideValue, StaticOverrides};
pub use resolver::{resolve, resolve_with_report, ResolutionReport, ResolvedConfig, Source};
pub use projector::{project, ControlFormat, ProjectionFormat, UiFact, UiFacts};
pub use feedback::{
    FeedbackChannel, FeedbackError, FeedbackStatus, KeyedAppState, LoggingFeedback, NoFeedback,
    QueuedFeedback, Severity,
};
pub use session::{RestrictionSession, SessionUpdate};

/// Keys declared by the sample restriction schema
pub mod keys {
    pub const CAN_SAY_HELLO: &str = "can_say_hello";
    pub const MESSAGE: &str = "message";
    pub const NUMBER: &str = "number";
    pub const RANK: &str = "rank";
    pub const APPROVALS: &str = "approvals";
    pub const ITEMS: &str = "items";
    pub const ITEM_KEY: &str = "key";
    pub const ITEM_VALUE: &str = "value";
}
