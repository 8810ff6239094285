//! In-memory identity provider for tests/dev.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use tracing::info;
use uuid::Uuid;

use corehr_core::AccountId;

use crate::provider::{AccountProfile, AccountSnapshot, IdentityError, IdentityProvider};

#[derive(Debug, Clone)]
struct StoredAccount {
    profile: AccountProfile,
    enabled: bool,
}

/// In-memory stand-in for the remote identity provider.
///
/// Enforces username uniqueness (conflict behavior of the real provider) and
/// exposes call counters plus failure toggles so sagas can be exercised
/// against provider outages.
#[derive(Debug, Default)]
pub struct InMemoryIdentityProvider {
    accounts: Mutex<HashMap<String, StoredAccount>>,
    create_calls: AtomicU32,
    update_calls: AtomicU32,
    delete_calls: AtomicU32,
    fail_create: AtomicBool,
    fail_update: AtomicBool,
    fail_delete: AtomicBool,
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of accounts currently held by the provider.
    pub fn account_count(&self) -> usize {
        self.accounts.lock().expect("provider lock poisoned").len()
    }

    pub fn create_calls(&self) -> u32 {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> u32 {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> u32 {
        self.delete_calls.load(Ordering::SeqCst)
    }

    /// Make subsequent `create_account` calls fail with a transport error.
    pub fn fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent `update_account` calls fail with a transport error.
    pub fn fail_update(&self, fail: bool) {
        self.fail_update.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent `delete_account` calls fail with a transport error.
    pub fn fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, StoredAccount>> {
        self.accounts.lock().expect("provider lock poisoned")
    }
}

impl IdentityProvider for InMemoryIdentityProvider {
    fn create_account(&self, profile: &AccountProfile) -> Result<AccountId, IdentityError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_create.load(Ordering::SeqCst) {
            return Err(IdentityError::Transport("injected create failure".into()));
        }
        if profile.username.trim().is_empty() {
            return Err(IdentityError::BadRequest("username must not be blank".into()));
        }

        let mut accounts = self.lock();
        if accounts
            .values()
            .any(|a| a.profile.username == profile.username)
        {
            return Err(IdentityError::Conflict);
        }

        let id = Uuid::now_v7().to_string();
        accounts.insert(
            id.clone(),
            StoredAccount {
                profile: profile.clone(),
                enabled: true,
            },
        );
        info!(account_id = %id, username = %profile.username, "identity account created");
        Ok(AccountId::new(id))
    }

    fn update_account(
        &self,
        id: &AccountId,
        profile: &AccountProfile,
    ) -> Result<(), IdentityError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_update.load(Ordering::SeqCst) {
            return Err(IdentityError::Transport("injected update failure".into()));
        }

        let mut accounts = self.lock();
        // Renaming onto a username held by a different account conflicts,
        // same as on create.
        if accounts
            .iter()
            .any(|(other, a)| other != id.as_str() && a.profile.username == profile.username)
        {
            return Err(IdentityError::Conflict);
        }
        let account = accounts
            .get_mut(id.as_str())
            .ok_or_else(|| IdentityError::BadRequest(format!("no such account: {id}")))?;
        account.profile = profile.clone();
        Ok(())
    }

    fn delete_account(&self, id: &AccountId) -> Result<(), IdentityError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(IdentityError::Transport("injected delete failure".into()));
        }

        self.lock().remove(id.as_str());
        Ok(())
    }

    fn fetch_account(&self, id: &AccountId) -> Result<AccountSnapshot, IdentityError> {
        let accounts = self.lock();
        let account = accounts
            .get(id.as_str())
            .ok_or_else(|| IdentityError::BadRequest(format!("no such account: {id}")))?;
        Ok(AccountSnapshot {
            account_id: id.clone(),
            profile: account.profile.clone(),
            enabled: account.enabled,
        })
    }

    fn restore_account(
        &self,
        id: &AccountId,
        snapshot: &AccountSnapshot,
    ) -> Result<(), IdentityError> {
        let mut accounts = self.lock();
        accounts.insert(
            id.as_str().to_string(),
            StoredAccount {
                profile: snapshot.profile.clone(),
                enabled: snapshot.enabled,
            },
        );
        Ok(())
    }
}
