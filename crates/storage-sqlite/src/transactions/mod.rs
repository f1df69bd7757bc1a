//! SQLite storage implementation for the append-only transaction history.

mod model;
mod repository;

pub use model::TransactionDB;
pub use repository::TransactionRepository;
