//! In-memory event bus for tests/dev.

use std::sync::RwLock;
use std::sync::mpsc;

use crate::bus::{EventBus, Subscription};

/// Publish-side failure of the in-memory bus.
#[derive(Debug)]
pub enum InMemoryBusError {
    /// A lock was poisoned by a panicking publisher or subscriber.
    Poisoned,
}

/// Broadcast bus over std mpsc channels.
///
/// Every subscription gets its own copy of every message, in publish order,
/// which preserves per-key ordering for consumers. Delivery stops at process
/// exit; nothing is persisted. Subscribers whose receiving end was dropped
/// are removed on the next publish.
#[derive(Debug)]
pub struct InMemoryEventBus<M> {
    senders: RwLock<Vec<mpsc::Sender<M>>>,
}

impl<M> Default for InMemoryEventBus<M> {
    fn default() -> Self {
        Self {
            senders: RwLock::new(Vec::new()),
        }
    }
}

impl<M> InMemoryEventBus<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live subscriptions, as of the last publish.
    pub fn subscriber_count(&self) -> usize {
        self.senders.read().map(|s| s.len()).unwrap_or(0)
    }
}

impl<M> EventBus<M> for InMemoryEventBus<M>
where
    M: Clone + Send + 'static,
{
    type Error = InMemoryBusError;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        let mut senders = self
            .senders
            .write()
            .map_err(|_| InMemoryBusError::Poisoned)?;

        senders.retain(|tx| tx.send(message.clone()).is_ok());
        Ok(())
    }

    fn subscribe(&self) -> Subscription<M> {
        let (tx, rx) = mpsc::channel();
        if let Ok(mut senders) = self.senders.write() {
            senders.push(tx);
        }
        Subscription::new(rx)
    }
}
