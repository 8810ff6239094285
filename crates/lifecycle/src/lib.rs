//! Saga coordination for the employee lifecycle.
//!
//! Create and update span two systems — the local store and the identity
//! provider — without a shared transaction. Consistency comes from explicit
//! compensation: undo the already-applied remote side effect when the local
//! step fails, then surface the original error.

pub mod coordinator;
pub mod error;

pub use coordinator::EmployeeLifecycle;
pub use error::LifecycleError;
