//! Employee aggregate root and address value-children.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use corehr_core::{AccountId, AddressId, DomainError, DomainResult, EmployeeId};

/// Employee lifecycle status. `Terminated` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EmployeeStatus {
    Active,
    Terminated,
}

/// Address category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressKind {
    Home,
    Work,
    Mailing,
}

/// Address owned by an employee.
///
/// Carries the owning employee id as a plain foreign reference; there is no
/// back-pointer to the aggregate, so no reference cycle exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    id: AddressId,
    employee_id: EmployeeId,
    kind: AddressKind,
    street: String,
    city: String,
    postal_code: String,
    country: String,
}

impl Address {
    pub fn id(&self) -> AddressId {
        self.id
    }

    pub fn employee_id(&self) -> EmployeeId {
        self.employee_id
    }

    pub fn kind(&self) -> AddressKind {
        self.kind
    }

    pub fn street(&self) -> &str {
        &self.street
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    pub fn postal_code(&self) -> &str {
        &self.postal_code
    }

    pub fn country(&self) -> &str {
        &self.country
    }
}

/// Address fields supplied at employee creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAddress {
    pub kind: AddressKind,
    pub street: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

/// Input for creating an employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEmployee {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    /// Desired login name in the identity provider, unique locally too.
    pub account_name: String,
    pub started_work: NaiveDate,
    pub addresses: Vec<NewAddress>,
}

/// Mutable profile fields for an update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeUpdate {
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub account_name: String,
}

/// Input for terminating an employment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Termination {
    pub end_work: NaiveDate,
    pub reason: String,
}

/// Aggregate root: an employee linked to one external identity account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    id: EmployeeId,
    /// External identity-provider account. Set once at creation, immutable
    /// afterwards absent compensation.
    account_id: AccountId,
    first_name: String,
    last_name: String,
    email: String,
    phone_number: String,
    account_name: String,
    status: EmployeeStatus,
    started_work: NaiveDate,
    end_work: Option<NaiveDate>,
    termination_reason: Option<String>,
    /// Optimistic version counter, bumped by the store on every update.
    version: u64,
    addresses: Vec<Address>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Employee {
    /// Build a fresh aggregate from a creation request and the account id the
    /// identity provider assigned.
    pub fn create(id: EmployeeId, account_id: AccountId, draft: NewEmployee) -> Self {
        let now = Utc::now();
        let addresses = draft
            .addresses
            .into_iter()
            .map(|a| Address {
                id: AddressId::new(),
                employee_id: id,
                kind: a.kind,
                street: a.street,
                city: a.city,
                postal_code: a.postal_code,
                country: a.country,
            })
            .collect();

        Self {
            id,
            account_id,
            first_name: draft.first_name,
            last_name: draft.last_name,
            email: draft.email,
            phone_number: draft.phone_number,
            account_name: draft.account_name,
            status: EmployeeStatus::Active,
            started_work: draft.started_work,
            end_work: None,
            termination_reason: None,
            version: 0,
            addresses,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> EmployeeId {
        self.id
    }

    pub fn account_id(&self) -> &AccountId {
        &self.account_id
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn phone_number(&self) -> &str {
        &self.phone_number
    }

    pub fn account_name(&self) -> &str {
        &self.account_name
    }

    pub fn status(&self) -> EmployeeStatus {
        self.status
    }

    pub fn started_work(&self) -> NaiveDate {
        self.started_work
    }

    pub fn end_work(&self) -> Option<NaiveDate> {
        self.end_work
    }

    pub fn termination_reason(&self) -> Option<&str> {
        self.termination_reason.as_deref()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn addresses(&self) -> &[Address] {
        &self.addresses
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Apply profile changes from an update request.
    pub fn apply_update(&mut self, update: &EmployeeUpdate) {
        self.first_name = update.first_name.clone();
        self.last_name = update.last_name.clone();
        self.phone_number = update.phone_number.clone();
        self.account_name = update.account_name.clone();
        self.updated_at = Utc::now();
    }

    /// Terminate the employment.
    ///
    /// Rejects termination of an already-terminated employee and an end date
    /// preceding the start date. Checks run before any mutation, so a failed
    /// call leaves the aggregate untouched.
    pub fn terminate(&mut self, end_work: NaiveDate, reason: &str) -> DomainResult<()> {
        if self.status == EmployeeStatus::Terminated {
            return Err(DomainError::invalid_state("employee is already terminated"));
        }
        if end_work < self.started_work {
            return Err(DomainError::validation(
                "end date cannot be before start date",
            ));
        }

        self.status = EmployeeStatus::Terminated;
        self.end_work = Some(end_work);
        self.termination_reason = Some(reason.to_string());
        self.updated_at = Utc::now();
        Ok(())
    }

    pub(crate) fn bump_version(&mut self) {
        self.version += 1;
    }
}
