//! Local employee store seam and an in-memory implementation.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

use corehr_core::{EmployeeId, ExpectedVersion};

use crate::employee::Employee;

/// Local persistence error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness constraint (email, account name, primary key) was violated.
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    /// The write lost an optimistic concurrency race.
    #[error("concurrency conflict: {0}")]
    Concurrency(String),

    /// The store could not be reached or failed mid-operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Transactional CRUD seam for the employee aggregate.
///
/// A single call is one local transaction: it either fully applies or leaves
/// no trace. Version checking on `update` is the only concurrency control.
pub trait EmployeeStore: Send + Sync {
    fn email_exists(&self, email: &str) -> Result<bool, StoreError>;

    fn account_name_exists(&self, account_name: &str) -> Result<bool, StoreError>;

    /// Persist a new aggregate (with its addresses) in one transaction.
    fn insert(&self, employee: Employee) -> Result<Employee, StoreError>;

    /// Persist changes to an existing aggregate, enforcing the expected
    /// version. The stored version is bumped on success.
    fn update(&self, employee: Employee, expected: ExpectedVersion)
    -> Result<Employee, StoreError>;

    fn load(&self, id: EmployeeId) -> Result<Option<Employee>, StoreError>;
}

impl<S> EmployeeStore for std::sync::Arc<S>
where
    S: EmployeeStore + ?Sized,
{
    fn email_exists(&self, email: &str) -> Result<bool, StoreError> {
        (**self).email_exists(email)
    }

    fn account_name_exists(&self, account_name: &str) -> Result<bool, StoreError> {
        (**self).account_name_exists(account_name)
    }

    fn insert(&self, employee: Employee) -> Result<Employee, StoreError> {
        (**self).insert(employee)
    }

    fn update(
        &self,
        employee: Employee,
        expected: ExpectedVersion,
    ) -> Result<Employee, StoreError> {
        (**self).update(employee, expected)
    }

    fn load(&self, id: EmployeeId) -> Result<Option<Employee>, StoreError> {
        (**self).load(id)
    }
}

/// In-memory employee store.
///
/// Intended for tests/dev. Enforces the same constraints a relational store
/// would: unique email and account name, optimistic version on update. An
/// injectable outage flag lets saga tests simulate a failing database.
#[derive(Debug, Default)]
pub struct InMemoryEmployeeStore {
    employees: RwLock<HashMap<EmployeeId, Employee>>,
    fail_writes: AtomicBool,
}

impl InMemoryEmployeeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent writes fail as if the store were down.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.employees.read().expect("store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("injected write failure".into()))
        } else {
            Ok(())
        }
    }
}

impl EmployeeStore for InMemoryEmployeeStore {
    fn email_exists(&self, email: &str) -> Result<bool, StoreError> {
        let employees = self.employees.read().expect("store lock poisoned");
        Ok(employees.values().any(|e| e.email() == email))
    }

    fn account_name_exists(&self, account_name: &str) -> Result<bool, StoreError> {
        let employees = self.employees.read().expect("store lock poisoned");
        Ok(employees.values().any(|e| e.account_name() == account_name))
    }

    fn insert(&self, employee: Employee) -> Result<Employee, StoreError> {
        self.check_writable()?;

        let mut employees = self.employees.write().expect("store lock poisoned");
        if employees.contains_key(&employee.id()) {
            return Err(StoreError::DuplicateKey(format!(
                "employee {} already exists",
                employee.id()
            )));
        }
        if employees.values().any(|e| e.email() == employee.email()) {
            return Err(StoreError::DuplicateKey(format!(
                "email '{}' already exists",
                employee.email()
            )));
        }
        if employees
            .values()
            .any(|e| e.account_name() == employee.account_name())
        {
            return Err(StoreError::DuplicateKey(format!(
                "account name '{}' already exists",
                employee.account_name()
            )));
        }

        employees.insert(employee.id(), employee.clone());
        Ok(employee)
    }

    fn update(
        &self,
        mut employee: Employee,
        expected: ExpectedVersion,
    ) -> Result<Employee, StoreError> {
        self.check_writable()?;

        let mut employees = self.employees.write().expect("store lock poisoned");
        let current = employees.get(&employee.id()).ok_or_else(|| {
            StoreError::Concurrency(format!("employee {} no longer exists", employee.id()))
        })?;

        if !expected.matches(current.version()) {
            return Err(StoreError::Concurrency(format!(
                "stale write for employee {} (expected {:?}, stored {})",
                employee.id(),
                expected,
                current.version()
            )));
        }

        // Unique columns hold on update too, not just insert.
        if employees
            .values()
            .any(|e| e.id() != employee.id() && e.email() == employee.email())
        {
            return Err(StoreError::DuplicateKey(format!(
                "email '{}' already exists",
                employee.email()
            )));
        }
        if employees
            .values()
            .any(|e| e.id() != employee.id() && e.account_name() == employee.account_name())
        {
            return Err(StoreError::DuplicateKey(format!(
                "account name '{}' already exists",
                employee.account_name()
            )));
        }

        employee.bump_version();
        employees.insert(employee.id(), employee.clone());
        Ok(employee)
    }

    fn load(&self, id: EmployeeId) -> Result<Option<Employee>, StoreError> {
        let employees = self.employees.read().expect("store lock poisoned");
        Ok(employees.get(&id).cloned())
    }
}
