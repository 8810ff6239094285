//! Immutable audit trail: idempotent consumption, retry policy, query surface.

pub mod consumer;
pub mod query;
pub mod record;
pub mod retry;
pub mod store;
pub mod worker;

pub use consumer::{AuditConsumer, ConsumeError, ProcessOutcome};
pub use query::{AuditFilter, Page, PageRequest};
pub use record::AuditRecord;
pub use retry::RetryPolicy;
pub use store::{AuditStore, AuditStoreError, InMemoryAuditStore};
pub use worker::{ConsumerWorker, WorkerHandle};
