//! Transactions module - append-only trade history.

mod transactions_model;
mod transactions_traits;

pub use transactions_model::{StoredTransaction, TransactionDirection, TransactionRecord};
pub use transactions_traits::TransactionRepositoryTrait;
