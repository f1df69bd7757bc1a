//! Stockfolio Core - Domain models, errors, configuration and repository traits.
//!
//! This crate is database-agnostic. Persistence contracts are declared here as
//! traits and implemented by the `storage-sqlite` crate; broker integrations
//! live in the `connect` crate.

pub mod accounts;
pub mod analytics;
pub mod balances;
pub mod brokers;
pub mod config;
pub mod errors;
pub mod holdings;
pub mod sync;
pub mod transactions;
pub mod utils;

pub use sync::UpsertOutcome;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
