//! Enterprise Feedback
//!
//! Keyed app states pushed to the device management side after resolution.
//! Delivery is fire-and-forget: the status is logged and otherwise ignored.

use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use tracing::info;

pub const MAX_KEY_LENGTH: usize = 100;
pub const MAX_MESSAGE_LENGTH: usize = 1000;
pub const MAX_DATA_LENGTH: usize = 1000;

/// Feedback errors
#[derive(Debug, thiserror::Error)]
pub enum FeedbackError {
    #[error("Key must not be empty")]
    EmptyKey,
    #[error("{field} exceeds {max} characters ({len})")]
    TooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },
}

/// Severity of a keyed app state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    #[default]
    Error,
}

/// One feedback message about a configuration key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyedAppState {
    pub key: String,
    pub severity: Severity,
    pub message: Option<String>,
    pub data: Option<String>,
}

impl KeyedAppState {
    pub fn builder(key: &str) -> KeyedAppStateBuilder {
        KeyedAppStateBuilder {
            key: key.to_string(),
            severity: Severity::default(),
            message: None,
            data: None,
        }
    }
}

/// Builder enforcing the platform's size limits
#[derive(Debug, Clone)]
pub struct KeyedAppStateBuilder {
    key: String,
    severity: Severity,
    message: Option<String>,
    data: Option<String>,
}

impl KeyedAppStateBuilder {
    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn build(self) -> Result<KeyedAppState, FeedbackError> {
        if self.key.is_empty() {
            return Err(FeedbackError::EmptyKey);
        }
        check_len("key", &self.key, MAX_KEY_LENGTH)?;
        if let Some(ref message) = self.message {
            check_len("message", message, MAX_MESSAGE_LENGTH)?;
        }
        if let Some(ref data) = self.data {
            check_len("data", data, MAX_DATA_LENGTH)?;
        }

        Ok(KeyedAppState {
            key: self.key,
            severity: self.severity,
            message: self.message,
            data: self.data,
        })
    }
}

fn check_len(field: &'static str, value: &str, max: usize) -> Result<(), FeedbackError> {
    let len = value.chars().count();
    if len > max {
        Err(FeedbackError::TooLong { field, len, max })
    } else {
        Ok(())
    }
}

/// Terminal outcome of a delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackStatus {
    Success,
    UnknownError,
    TransactionTooLarge,
    ExceededBuffer,
}

impl FeedbackStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackStatus::Success => "SUCCESS",
            FeedbackStatus::UnknownError => "UNKNOWN_ERROR",
            FeedbackStatus::TransactionTooLarge => "TRANSACTION_TOO_LARGE_ERROR",
            FeedbackStatus::ExceededBuffer => "EXCEEDED_BUFFER_ERROR",
        }
    }
}

/// Destination for keyed app states
pub trait FeedbackChannel: Send + Sync {
    fn send(&self, states: Vec<KeyedAppState>) -> FeedbackStatus;
}

/// Send states and log the outcome; the status is never acted upon
pub fn report(channel: &dyn FeedbackChannel, states: Vec<KeyedAppState>) {
    if states.is_empty() {
        return;
    }
    let status = channel.send(states);
    info!("KeyedAppStatesCallback status: {}", status.as_str());
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFeedback;

impl FeedbackChannel for NoFeedback {
    fn send(&self, _states: Vec<KeyedAppState>) -> FeedbackStatus {
        FeedbackStatus::Success
    }
}

/// Writes states to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingFeedback;

impl FeedbackChannel for LoggingFeedback {
    fn send(&self, states: Vec<KeyedAppState>) -> FeedbackStatus {
        for state in &states {
            info!(
                key = %state.key,
                severity = ?state.severity,
                data = state.data.as_deref().unwrap_or(""),
                "{}",
                state.message.as_deref().unwrap_or("")
            );
        }
        FeedbackStatus::Success
    }
}

/// Queues states for an observer on the other end of a channel
#[derive(Debug, Clone)]
pub struct QueuedFeedback {
    sender: Sender<KeyedAppState>,
}

impl QueuedFeedback {
    /// Create the channel and the receiving end
    pub fn new() -> (Self, Receiver<KeyedAppState>) {
        let (sender, receiver) = unbounded();
        (Self { sender }, receiver)
    }
}

impl FeedbackChannel for QueuedFeedback {
    fn send(&self, states: Vec<KeyedAppState>) -> FeedbackStatus {
        for state in states {
            if self.sender.send(state).is_err() {
                return FeedbackStatus::UnknownError;
            }
        }
        FeedbackStatus::Success
    }
}
