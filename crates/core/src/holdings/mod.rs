//! Holdings module - fetched positions and the "current holdings" view.

mod holdings_model;
mod holdings_traits;

pub use holdings_model::{HoldingSnapshot, StockQuote, StoredHolding};
pub use holdings_traits::HoldingRepositoryTrait;
