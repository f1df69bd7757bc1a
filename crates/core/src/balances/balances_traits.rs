//! Balance repository trait.

use async_trait::async_trait;
use chrono::NaiveDate;

use super::balances_model::{BalanceSnapshot, DailyBalance};
use crate::errors::Result;
use crate::UpsertOutcome;

/// Persistence contract for daily balances.
#[async_trait]
pub trait BalanceRepositoryTrait: Send + Sync {
    /// Writes the snapshot for (account, date) inside a single transaction.
    ///
    /// An existing row for the same key is updated in place and its
    /// modification timestamp bumped; otherwise a new row is inserted.
    async fn upsert_daily_balance(
        &self,
        account_id: &str,
        balance_date: NaiveDate,
        snapshot: BalanceSnapshot,
    ) -> Result<UpsertOutcome>;

    fn get_daily_balance(
        &self,
        account_id: &str,
        balance_date: NaiveDate,
    ) -> Result<Option<DailyBalance>>;

    /// Balance history for an account, oldest first, bounds inclusive.
    fn list_daily_balances(
        &self,
        account_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<DailyBalance>>;
}
