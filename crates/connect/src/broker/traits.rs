//! The capability set every broker integration implements.

use async_trait::async_trait;
use chrono::NaiveDate;

use stockfolio_core::accounts::AccountSnapshot;
use stockfolio_core::balances::BalanceSnapshot;
use stockfolio_core::brokers::{ApiKind, BrokerConnection};
use stockfolio_core::errors::Result;
use stockfolio_core::holdings::HoldingSnapshot;
use stockfolio_core::transactions::TransactionRecord;

/// A connection to one brokerage.
///
/// Methods fail with [`stockfolio_core::Error::Broker`] on operational
/// failures and [`stockfolio_core::Error::Authentication`] when the credential
/// exchange is rejected. Data methods connect lazily when needed.
#[async_trait]
pub trait BrokerClient: Send + Sync {
    /// Registry name of this broker.
    fn name(&self) -> &str;

    fn api_kind(&self) -> ApiKind;

    async fn connect(&self) -> Result<bool>;

    async fn disconnect(&self) -> Result<bool>;

    /// Pure observer of the connection state.
    fn is_connected(&self) -> bool;

    async fn get_accounts(&self) -> Result<Vec<AccountSnapshot>>;

    async fn get_balance(&self, account_number: &str) -> Result<BalanceSnapshot>;

    async fn get_holdings(&self, account_number: &str) -> Result<Vec<HoldingSnapshot>>;

    async fn get_transactions(
        &self,
        account_number: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<TransactionRecord>>;

    fn connection(&self) -> BrokerConnection {
        BrokerConnection {
            broker_name: self.name().to_string(),
            api_kind: self.api_kind(),
            connected: self.is_connected(),
        }
    }
}
