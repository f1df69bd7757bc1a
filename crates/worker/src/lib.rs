//! Stockfolio worker - runs one vendor request per process.
//!
//! The vendor control only exists inside a foreign runtime, so the parent
//! spawns this binary per call as `stockfolio-worker <command> [account]` and
//! reads exactly one JSON document from stdout. Logging goes to stderr.

pub mod errors;
pub mod replay;
pub mod session;
pub mod settings;
pub mod worker;

pub use errors::WorkerError;
pub use replay::ReplaySession;
pub use session::{SessionEvent, VendorSession};
pub use settings::WorkerSettings;
pub use worker::{run, Worker};
