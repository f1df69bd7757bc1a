//! Transaction repository trait.

use async_trait::async_trait;
use chrono::NaiveDate;

use super::transactions_model::{StoredTransaction, TransactionRecord};
use crate::errors::Result;

#[async_trait]
pub trait TransactionRepositoryTrait: Send + Sync {
    /// Inserts every record as a new row and returns the inserted count.
    async fn append_transactions(
        &self,
        account_id: &str,
        transactions: Vec<TransactionRecord>,
    ) -> Result<usize>;

    /// Transactions in the inclusive date range, oldest first.
    fn list_transactions(
        &self,
        account_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<StoredTransaction>>;

    /// Every stored transaction of one symbol, oldest first.
    fn list_symbol_transactions(
        &self,
        account_id: &str,
        symbol: &str,
    ) -> Result<Vec<StoredTransaction>>;
}
