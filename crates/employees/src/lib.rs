//! Employee aggregate and its local persistence seam.

pub mod employee;
pub mod store;

pub use employee::{
    Address, AddressKind, Employee, EmployeeStatus, EmployeeUpdate, NewAddress, NewEmployee,
    Termination,
};
pub use store::{EmployeeStore, InMemoryEmployeeStore, StoreError};
