//! SQLite storage implementation for Stockfolio.
//!
//! Implements the repository traits declared in `stockfolio-core` with Diesel
//! over SQLite:
//! - connection pooling, pragmas and embedded migrations
//! - a single writer actor so every reconciliation runs in one transaction
//! - account, daily balance, holding and transaction repositories
//!
//! ```text
//! core (traits)          connect (ingestion)
//!       │                      │
//!       └──────────┬───────────┘
//!                  │
//!                  ▼
//!          storage-sqlite (this crate)
//!                  │
//!                  ▼
//!              SQLite DB
//! ```

pub mod db;
pub mod errors;
pub mod schema;
pub mod utils;

pub mod accounts;
pub mod balances;
pub mod holdings;
pub mod transactions;

pub use db::{
    create_pool, get_connection, init, open, run_migrations, spawn_writer, DbConnection, DbPool,
    WriteHandle,
};

pub use errors::{IntoCore, StorageError};

pub use accounts::AccountRepository;
pub use balances::BalanceRepository;
pub use holdings::HoldingRepository;
pub use transactions::TransactionRepository;

pub use stockfolio_core::errors::{DatabaseError, Error, Result};
