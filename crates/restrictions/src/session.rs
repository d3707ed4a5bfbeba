//! Restriction Session
//!
//! Caller-owned context that resolves and projects on every change
//! notification and remembers what the UI needs between events.

use tracing::{debug, warn};

use crate::keys::{CAN_SAY_HELLO as KEY_CAN_SAY_HELLO, MESSAGE as KEY_MESSAGE};
use crate::feedback::{self, FeedbackChannel, KeyedAppState, NoFeedback, Severity};
use crate::overrides::OverrideMap;
use crate::projector::{fill_template, project, ProjectionFormat, UiFact, UiFacts};
use crate::resolver::{resolve, ResolvedConfig};
use crate::schema::Schema;

/// Result of handling one notification
#[derive(Debug, Clone)]
pub struct SessionUpdate {
    pub resolved: ResolvedConfig,
    pub facts: UiFacts,
    /// Facts that differ from the previous notification
    pub changed: Vec<(String, UiFact)>,
}

/// Per-screen restriction state
pub struct RestrictionSession {
    schema: Schema,
    format: ProjectionFormat,
    message_template: String,
    feedback: Box<dyn FeedbackChannel>,
    severity: Severity,
    monitored_keys: Vec<String>,
    facts: UiFacts,
    message: Option<String>,
}

impl RestrictionSession {
    pub fn new(schema: Schema, format: ProjectionFormat) -> Self {
        Self {
            schema,
            format,
            message_template: "{}".to_string(),
            feedback: Box::new(NoFeedback),
            severity: Severity::default(),
            monitored_keys: Vec::new(),
            facts: UiFacts::default(),
            message: None,
        }
    }

    /// Template used by [`say_hello`](Self::say_hello)
    pub fn with_message_template(mut self, template: &str) -> Self {
        self.message_template = template.to_string();
        self
    }

    /// Report the resolved value of each monitored key to `channel`
    pub fn with_feedback(
        mut self,
        channel: Box<dyn FeedbackChannel>,
        monitored_keys: Vec<String>,
        severity: Severity,
    ) -> Self {
        self.feedback = channel;
        self.monitored_keys = monitored_keys;
        self.severity = severity;
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Facts as of the last notification
    pub fn facts(&self) -> &UiFacts {
        &self.facts
    }

    /// Message retained from the last notification
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Recompute everything for a fresh override snapshot
    pub fn on_restrictions_changed(&mut self, overrides: Option<&OverrideMap>) -> SessionUpdate {
        let resolved = resolve(&self.schema, overrides);
        let facts = project(&resolved, &self.format);

        let changed: Vec<(String, UiFact)> = facts
            .changed_since(&self.facts)
            .into_iter()
            .map(|(k, f)| (k.to_string(), f.clone()))
            .collect();
        debug!("{} of {} facts changed", changed.len(), facts.len());

        if self.schema.contains(KEY_MESSAGE) {
            self.message = resolved.text(KEY_MESSAGE).map(str::to_string);
        }

        self.send_feedback(&resolved);
        self.facts = facts.clone();

        SessionUpdate {
            resolved,
            facts,
            changed,
        }
    }

    /// Text to show when the user presses the hello button, if allowed
    pub fn say_hello(&self) -> Option<String> {
        let allowed = self
            .facts
            .get(KEY_CAN_SAY_HELLO)
            .map(|f| f.enabled)
            .unwrap_or(false);
        if !allowed {
            return None;
        }
        Some(fill_template(
            &self.message_template,
            self.message.as_deref().unwrap_or(""),
        ))
    }

    fn send_feedback(&self, resolved: &ResolvedConfig) {
        let mut states = Vec::new();
        for key in &self.monitored_keys {
            let Some(value) = resolved.get(key) else {
                continue;
            };
            let rendered = self.format.render_value(value);
            let state = KeyedAppState::builder(key)
                .severity(self.severity)
                .message(format!("Value is {}", rendered))
                .data(rendered)
                .build();
            match state {
                Ok(state) => states.push(state),
                Err(e) => warn!("Not reporting '{}': {}", key, e),
            }
        }
        feedback::report(self.feedback.as_ref(), states);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::QueuedFeedback;
    use crate::overrides::OverrideValue;
    use crate::projector::ControlFormat;
    use crate::schema::SchemaEntry;

    fn session() -> RestrictionSession {
        let schema = Schema::new(vec![
            SchemaEntry::bool(KEY_CAN_SAY_HELLO, true),
            SchemaEntry::text(KEY_MESSAGE, "Hello!"),
            SchemaEntry::int("number", 10),
        ])
        .unwrap();
        let format = ProjectionFormat::default()
            .with_control(KEY_CAN_SAY_HELLO, ControlFormat::toggle("yes", "no"))
            .with_control("number", ControlFormat::label("Your number: {}"));
        RestrictionSession::new(schema, format).with_message_template("Message: {}")
    }

    #[test]
    fn test_first_notification_changes_everything() {
        let mut session = session();
        let update = session.on_restrictions_changed(None);
        assert_eq!(update.changed.len(), 2);
        assert_eq!(session.message(), Some("Hello!"));
    }

    #[test]
    fn test_only_changed_facts_reported() {
        let mut session = session();
        session.on_restrictions_changed(None);

        let overrides = OverrideMap::new().with("number", OverrideValue::Int(3));
        let update = session.on_restrictions_changed(Some(&overrides));
        assert_eq!(update.changed.len(), 1);
        assert_eq!(update.changed[0].1.display_text, "Your number: 3");

        let update = session.on_restrictions_changed(Some(&overrides));
        assert!(update.changed.is_empty());
    }

    #[test]
    fn test_say_hello() {
        let mut session = session();
        assert_eq!(session.say_hello(), None);

        let overrides = OverrideMap::new().with(KEY_MESSAGE, OverrideValue::Text("Hi".into()));
        session.on_restrictions_changed(Some(&overrides));
        assert_eq!(session.say_hello().as_deref(), Some("Message: Hi"));

        let overrides = OverrideMap::new().with(KEY_CAN_SAY_HELLO, OverrideValue::Bool(false));
        session.on_restrictions_changed(Some(&overrides));
        assert_eq!(session.say_hello(), None);
    }

    #[test]
    fn test_feedback_for_monitored_keys() {
        let (channel, receiver) = QueuedFeedback::new();
        let mut session = session().with_feedback(
            Box::new(channel),
            vec![KEY_CAN_SAY_HELLO.to_string(), KEY_MESSAGE.to_string(), "absent".to_string()],
            Severity::Info,
        );

        session.on_restrictions_changed(None);
        let states: Vec<_> = receiver.try_iter().collect();
        assert_eq!(states.len(), 2);
        assert_eq!(states[0].key, KEY_CAN_SAY_HELLO);
        assert_eq!(states[0].message.as_deref(), Some("Value is true"));
        assert_eq!(states[1].data.as_deref(), Some("Hello!"));
        assert_eq!(states[1].severity, Severity::Info);
    }
}
