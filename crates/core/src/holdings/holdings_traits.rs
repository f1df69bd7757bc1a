//! Holding repository trait.

use async_trait::async_trait;

use super::holdings_model::{HoldingSnapshot, StoredHolding};
use crate::errors::Result;

/// Persistence contract for the current holdings of an account.
#[async_trait]
pub trait HoldingRepositoryTrait: Send + Sync {
    /// Replaces every holding of the account with `holdings`, atomically.
    ///
    /// Symbols absent from `holdings` disappear from the current view.
    /// Returns the number of rows written.
    async fn replace_holdings(
        &self,
        account_id: &str,
        holdings: Vec<HoldingSnapshot>,
    ) -> Result<usize>;

    /// Current holdings of an account ordered by symbol.
    fn list_holdings(&self, account_id: &str) -> Result<Vec<StoredHolding>>;
}
