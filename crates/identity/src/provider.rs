//! Identity provider contract.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use corehr_core::AccountId;

/// Profile data pushed to the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountProfile {
    /// Login name, unique within the provider realm.
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// Point-in-time copy of a remote account, used to revert a failed update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub account_id: AccountId,
    pub profile: AccountProfile,
    pub enabled: bool,
}

/// Errors raised by the identity provider gateway.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// The account (username/email) already exists on the provider side.
    #[error("account already exists in identity provider")]
    Conflict,

    /// The provider rejected the request as malformed.
    #[error("identity provider rejected request: {0}")]
    BadRequest(String),

    /// The provider could not be reached or answered with a server error.
    #[error("identity provider transport failure: {0}")]
    Transport(String),
}

/// Gateway to the external identity provider.
///
/// Calls are blocking from the saga's point of view; whatever failure they
/// raise propagates into the saga, which decides whether to compensate.
pub trait IdentityProvider: Send + Sync {
    /// Create a remote account and return its provider-assigned id.
    fn create_account(&self, profile: &AccountProfile) -> Result<AccountId, IdentityError>;

    /// Overwrite the remote account's profile.
    fn update_account(&self, id: &AccountId, profile: &AccountProfile)
    -> Result<(), IdentityError>;

    /// Delete the remote account.
    ///
    /// Compensation path: callers treat failures as log-only so the original
    /// error that triggered the compensation is not masked.
    fn delete_account(&self, id: &AccountId) -> Result<(), IdentityError>;

    /// Fetch the current account state as a restorable snapshot.
    fn fetch_account(&self, id: &AccountId) -> Result<AccountSnapshot, IdentityError>;

    /// Revert the account to a previously fetched snapshot.
    fn restore_account(
        &self,
        id: &AccountId,
        snapshot: &AccountSnapshot,
    ) -> Result<(), IdentityError>;
}

impl<P> IdentityProvider for Arc<P>
where
    P: IdentityProvider + ?Sized,
{
    fn create_account(&self, profile: &AccountProfile) -> Result<AccountId, IdentityError> {
        (**self).create_account(profile)
    }

    fn update_account(
        &self,
        id: &AccountId,
        profile: &AccountProfile,
    ) -> Result<(), IdentityError> {
        (**self).update_account(id, profile)
    }

    fn delete_account(&self, id: &AccountId) -> Result<(), IdentityError> {
        (**self).delete_account(id)
    }

    fn fetch_account(&self, id: &AccountId) -> Result<AccountSnapshot, IdentityError> {
        (**self).fetch_account(id)
    }

    fn restore_account(
        &self,
        id: &AccountId,
        snapshot: &AccountSnapshot,
    ) -> Result<(), IdentityError> {
        (**self).restore_account(id, snapshot)
    }
}
