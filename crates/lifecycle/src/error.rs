//! Closed error set for saga operations.

use thiserror::Error;

use corehr_core::DomainError;
use corehr_employees::StoreError;
use corehr_identity::IdentityError;

/// Everything a lifecycle saga can fail with.
///
/// One tagged kind per caller-visible failure mode, so call sites handle each
/// case explicitly instead of matching on exception types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    /// A uniqueness constraint is already taken (locally or at the provider).
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The employee does not exist.
    #[error("employee not found")]
    NotFound,

    /// Input failed a domain validation rule.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The operation is not legal in the aggregate's current state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The write lost an optimistic concurrency race; the caller may retry.
    #[error("concurrent modification: {0}")]
    Concurrency(String),

    /// The identity provider rejected the request as malformed.
    #[error("identity provider rejected request: {0}")]
    Provider(String),

    /// The identity provider could not be reached.
    #[error("identity provider unreachable: {0}")]
    Transport(String),

    /// Local persistence failed.
    #[error("local persistence failed: {0}")]
    Storage(String),
}

impl From<IdentityError> for LifecycleError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Conflict => {
                LifecycleError::AlreadyExists("account already exists in identity provider".into())
            }
            IdentityError::BadRequest(msg) => LifecycleError::Provider(msg),
            IdentityError::Transport(msg) => LifecycleError::Transport(msg),
        }
    }
}

impl From<StoreError> for LifecycleError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateKey(msg) => LifecycleError::AlreadyExists(msg),
            StoreError::Concurrency(msg) => LifecycleError::Concurrency(msg),
            StoreError::Unavailable(msg) => LifecycleError::Storage(msg),
        }
    }
}

impl From<DomainError> for LifecycleError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => LifecycleError::Validation(msg),
            DomainError::InvalidState(msg) => LifecycleError::InvalidState(msg),
            DomainError::InvalidId(msg) => LifecycleError::Validation(msg),
            DomainError::NotFound => LifecycleError::NotFound,
            DomainError::Conflict(msg) => LifecycleError::Concurrency(msg),
        }
    }
}
