//! Event System
//!
//! Provides a pub/sub event bus carrying restriction change notifications
//! and their outcomes.

use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::RwLock;
use tracing::debug;

use managed_config_restrictions::{FeedbackChannel, FeedbackStatus, KeyedAppState, UiFact};

/// Events exchanged between the override source, the orchestrator and observers
#[derive(Debug, Clone)]
pub enum Event {
    /// Administrator overrides changed; resolve again
    RestrictionsChanged,
    /// A displayed fact changed after resolution
    FactsUpdated { key: String, fact: UiFact },
    /// A keyed app state was sent to the management side
    Feedback(KeyedAppState),
    /// Stop processing
    Shutdown,
}

/// Subscriber handle for receiving events
#[derive(Clone)]
pub struct EventSubscription {
    receiver: Receiver<Event>,
}

impl EventSubscription {
    /// Receive the next event (blocking)
    pub fn recv(&self) -> Result<Event, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an event (non-blocking)
    pub fn try_recv(&self) -> Result<Event, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Drain everything currently queued
    pub fn drain(&self) -> Vec<Event> {
        self.receiver.try_iter().collect()
    }
}

/// Event bus for publish/subscribe pattern
pub struct EventBus {
    subscribers: RwLock<Vec<Sender<Event>>>,
}

impl EventBus {
    /// Create a new event bus
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
        }
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> EventSubscription {
        let (sender, receiver) = unbounded();
        self.subscribers.write().push(sender);
        EventSubscription { receiver }
    }

    /// Emit an event to all subscribers, dropping the ones that went away
    pub fn emit(&self, event: Event) -> usize {
        let mut subscribers = self.subscribers.write();
        subscribers.retain(|sender| sender.send(event.clone()).is_ok());

        let delivered = subscribers.len();
        debug!("Event {:?} delivered to {} subscribers", event, delivered);
        delivered
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Feedback channel that publishes each state on the bus
pub struct EventFeedback {
    bus: Arc<EventBus>,
}

impl EventFeedback {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }
}

impl FeedbackChannel for EventFeedback {
    fn send(&self, states: Vec<KeyedAppState>) -> FeedbackStatus {
        for state in states {
            self.bus.emit(Event::Feedback(state));
        }
        FeedbackStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_bus() {
        let bus = EventBus::new();
        let sub1 = bus.subscribe();
        let sub2 = bus.subscribe();

        assert_eq!(bus.subscriber_count(), 2);

        let delivered = bus.emit(Event::RestrictionsChanged);
        assert_eq!(delivered, 2);

        assert!(sub1.try_recv().is_ok());
        assert!(sub2.try_recv().is_ok());
    }

    #[test]
    fn test_dropped_subscribers_are_removed() {
        let bus = EventBus::new();
        let kept = bus.subscribe();
        drop(bus.subscribe());

        assert_eq!(bus.emit(Event::Shutdown), 1);
        assert_eq!(bus.subscriber_count(), 1);
        assert!(matches!(kept.try_recv(), Ok(Event::Shutdown)));
    }

    #[test]
    fn test_event_feedback() {
        let bus = Arc::new(EventBus::new());
        let sub = bus.subscribe();
        let channel = EventFeedback::new(bus.clone());

        let state = KeyedAppState::builder("message").message("Value is hi").build().unwrap();
        assert_eq!(channel.send(vec![state]), FeedbackStatus::Success);
        assert!(matches!(sub.try_recv(), Ok(Event::Feedback(s)) if s.key == "message"));
    }
}
