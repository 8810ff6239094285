//! Commit-gated event publishing.
//!
//! An event must only hit the wire after the local mutation that produced it
//! is durably committed. The original transaction-commit callback hook is
//! modelled here as an explicit unit of work: events recorded while the unit
//! runs are transmitted only if the unit returns success.
//!
//! Local state and event emission are still not atomic — a transmit failure
//! after commit is logged and dropped, never rolled back against the already
//! committed mutation.

use tracing::{debug, error};

use crate::bus::EventBus;
use crate::event::{DomainEvent, WireMessage};

/// Events staged during one local transaction.
#[derive(Debug, Default)]
pub struct UnitOfWork {
    recorded: Vec<DomainEvent>,
}

impl UnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage an event for publication after commit.
    pub fn record(&mut self, event: DomainEvent) {
        self.recorded.push(event);
    }

    pub fn recorded(&self) -> &[DomainEvent] {
        &self.recorded
    }

    fn into_recorded(self) -> Vec<DomainEvent> {
        self.recorded
    }
}

/// Publisher that defers emission until the enclosing local mutation commits.
pub struct CommitGatedPublisher<B> {
    bus: B,
    topic: String,
}

impl<B> CommitGatedPublisher<B>
where
    B: EventBus<WireMessage>,
{
    pub fn new(bus: B, topic: impl Into<String>) -> Self {
        Self {
            bus,
            topic: topic.into(),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Run a local unit of work and publish its recorded events on success.
    ///
    /// If `work` returns an error, nothing recorded into the unit reaches the
    /// wire. On success each recorded event is transmitted exactly once.
    pub fn within<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut UnitOfWork) -> Result<T, E>,
    {
        let mut uow = UnitOfWork::new();
        let outcome = work(&mut uow)?;

        for event in uow.into_recorded() {
            self.transmit(&event);
        }
        Ok(outcome)
    }

    /// Publish immediately.
    ///
    /// For callers with no active local transaction (system/background work).
    pub fn publish_now(&self, event: &DomainEvent) {
        self.transmit(event);
    }

    fn transmit(&self, event: &DomainEvent) {
        let wire = match event.to_wire(&self.topic) {
            Ok(wire) => wire,
            Err(err) => {
                error!(
                    event_id = %event.event_id(),
                    error = %err,
                    "failed to serialize event for publication"
                );
                return;
            }
        };

        match self.bus.publish(wire) {
            Ok(()) => debug!(
                event_id = %event.event_id(),
                action = event.action(),
                entity_id = %event.entity_id(),
                "event published"
            ),
            // The local mutation already committed; losing the event is
            // preferable to failing the caller. An outbox would plug in here.
            Err(err) => error!(
                event_id = %event.event_id(),
                error = ?err,
                "failed to publish event after commit"
            ),
        }
    }
}
