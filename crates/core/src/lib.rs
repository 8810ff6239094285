//! `corehr-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod context;
pub mod error;
pub mod id;
pub mod version;

pub use context::RequestContext;
pub use error::{DomainError, DomainResult};
pub use id::{AccountId, ActorId, AddressId, EmployeeId};
pub use version::ExpectedVersion;
