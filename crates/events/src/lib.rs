//! Domain events, bus abstraction and commit-gated publishing.

pub mod bus;
pub mod event;
pub mod in_memory_bus;
pub mod publisher;

pub use bus::{EventBus, Subscription};
pub use event::{Action, DomainEvent, WireMessage, DEAD_LETTER_SUFFIX};
pub use in_memory_bus::InMemoryEventBus;
pub use publisher::{CommitGatedPublisher, UnitOfWork};
