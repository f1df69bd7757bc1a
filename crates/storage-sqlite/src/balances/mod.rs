//! SQLite storage implementation for daily balances.

mod model;
mod repository;

pub use model::DailyBalanceDB;
pub use repository::BalanceRepository;
