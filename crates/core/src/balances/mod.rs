//! Balances module - fetched balance snapshots and stored daily balances.

mod balances_model;
mod balances_traits;

pub use balances_model::{BalanceSnapshot, DailyBalance};
pub use balances_traits::BalanceRepositoryTrait;
