//! Identity-provider gateway: remote account management at the saga seam.

pub mod in_memory;
pub mod provider;

pub use in_memory::InMemoryIdentityProvider;
pub use provider::{AccountProfile, AccountSnapshot, IdentityError, IdentityProvider};
