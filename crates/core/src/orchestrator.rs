//! Restriction Orchestrator
//!
//! Connects change notifications to a restriction session:
//! - pulls a fresh override snapshot per notification
//! - resolves and projects through the session
//! - republishes changed facts on the event bus

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use managed_config_restrictions::{OverrideSupplier, RestrictionSession, SessionUpdate, UiFacts};

use crate::events::{Event, EventBus, EventSubscription};

/// Orchestrator state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    /// Waiting for notifications
    Idle,
    /// Handling a notification
    Resolving,
    /// Shutdown received
    Stopped,
}

/// Drives a session from restriction change notifications
pub struct Orchestrator {
    state: RwLock<OrchestratorState>,
    session: Mutex<RestrictionSession>,
    supplier: Arc<dyn OverrideSupplier>,
    event_bus: Arc<EventBus>,
}

impl Orchestrator {
    /// Create an orchestrator with its own event bus
    pub fn new(session: RestrictionSession, supplier: Arc<dyn OverrideSupplier>) -> Self {
        Self::with_event_bus(session, supplier, Arc::new(EventBus::new()))
    }

    /// Create an orchestrator publishing on an existing bus
    pub fn with_event_bus(
        session: RestrictionSession,
        supplier: Arc<dyn OverrideSupplier>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            state: RwLock::new(OrchestratorState::Idle),
            session: Mutex::new(session),
            supplier,
            event_bus,
        }
    }

    /// Get the event bus for subscribing to events
    pub fn event_bus(&self) -> Arc<EventBus> {
        self.event_bus.clone()
    }

    pub fn state(&self) -> OrchestratorState {
        *self.state.read()
    }

    fn set_state(&self, state: OrchestratorState) {
        let mut current = self.state.write();
        debug!("State transition: {:?} -> {:?}", *current, state);
        *current = state;
    }

    /// Announce that the overrides changed
    pub fn notify_restrictions_changed(&self) -> usize {
        self.event_bus.emit(Event::RestrictionsChanged)
    }

    /// Resolve against the supplier's current snapshot and publish changes
    pub fn refresh(&self) -> SessionUpdate {
        self.set_state(OrchestratorState::Resolving);

        let overrides = self.supplier.application_restrictions();
        debug!(
            "Resolving with {} override(s)",
            overrides.as_ref().map(|o| o.len()).unwrap_or(0)
        );
        let update = self.session.lock().on_restrictions_changed(overrides.as_ref());

        for (key, fact) in &update.changed {
            self.event_bus.emit(Event::FactsUpdated {
                key: key.clone(),
                fact: fact.clone(),
            });
        }

        self.set_state(OrchestratorState::Idle);
        update
    }

    /// Handle notifications from `subscription` until shutdown; returns how many were handled
    pub fn run(&self, subscription: EventSubscription) -> usize {
        info!("Orchestrator listening for restriction changes");
        let mut handled = 0;

        while let Ok(event) = subscription.recv() {
            match event {
                Event::RestrictionsChanged => {
                    self.refresh();
                    handled += 1;
                }
                Event::Shutdown => break,
                Event::FactsUpdated { .. } | Event::Feedback(_) => {}
            }
        }

        self.set_state(OrchestratorState::Stopped);
        info!("Orchestrator stopped after {} notification(s)", handled);
        handled
    }

    /// Request [`run`](Self::run) to return
    pub fn shutdown(&self) {
        self.event_bus.emit(Event::Shutdown);
    }

    /// Current facts
    pub fn facts(&self) -> UiFacts {
        self.session.lock().facts().clone()
    }

    /// Hello message, if the current restrictions allow it
    pub fn say_hello(&self) -> Option<String> {
        self.session.lock().say_hello()
    }
}
