//! Accounts module - broker account snapshots, registered accounts and traits.

mod accounts_model;
mod accounts_traits;

pub use accounts_model::{AccountSnapshot, RegisteredAccount};
pub use accounts_traits::AccountRepositoryTrait;
