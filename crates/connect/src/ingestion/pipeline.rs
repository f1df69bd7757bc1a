use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use log::{debug, error, info, warn};

use crate::registry::BrokerRegistry;
use stockfolio_core::accounts::{AccountRepositoryTrait, AccountSnapshot, RegisteredAccount};
use stockfolio_core::balances::{BalanceRepositoryTrait, BalanceSnapshot};
use stockfolio_core::errors::Result;
use stockfolio_core::holdings::{HoldingRepositoryTrait, HoldingSnapshot};
use stockfolio_core::sync::{AccountCollectionOutcome, AccountsRegistered, CollectionSummary};
use stockfolio_core::transactions::TransactionRepositoryTrait;
use stockfolio_core::utils::time_utils::market_date_today;
use stockfolio_core::UpsertOutcome;

/// Pulls balances, holdings and transactions through the registry and writes
/// them through the repositories.
///
/// Accounts are matched by account number and are never created as a side
/// effect of collection; see [`IngestionPipeline::register_accounts`].
pub struct IngestionPipeline {
    registry: Arc<BrokerRegistry>,
    accounts: Arc<dyn AccountRepositoryTrait>,
    balances: Arc<dyn BalanceRepositoryTrait>,
    holdings: Arc<dyn HoldingRepositoryTrait>,
    transactions: Arc<dyn TransactionRepositoryTrait>,
}

impl IngestionPipeline {
    pub fn new(
        registry: Arc<BrokerRegistry>,
        accounts: Arc<dyn AccountRepositoryTrait>,
        balances: Arc<dyn BalanceRepositoryTrait>,
        holdings: Arc<dyn HoldingRepositoryTrait>,
        transactions: Arc<dyn TransactionRepositoryTrait>,
    ) -> Self {
        Self {
            registry,
            accounts,
            balances,
            holdings,
            transactions,
        }
    }

    pub fn registry(&self) -> &BrokerRegistry {
        &self.registry
    }

    fn lookup_account(&self, account_number: &str) -> Result<Option<RegisteredAccount>> {
        let account = self.accounts.find_by_number(account_number)?;
        if account.is_none() {
            warn!(
                "Account {} is not registered, skipping (run account registration first)",
                account_number
            );
        }
        Ok(account)
    }

    /// Collects balance and holdings of one account, dated today in the
    /// market's time zone.
    pub async fn collect_account_data(
        &self,
        broker_name: &str,
        account_number: &str,
    ) -> Result<AccountCollectionOutcome> {
        self.collect_account_data_on(broker_name, account_number, market_date_today())
            .await
    }

    /// Collects balance and holdings of one account for `balance_date`.
    pub async fn collect_account_data_on(
        &self,
        broker_name: &str,
        account_number: &str,
        balance_date: NaiveDate,
    ) -> Result<AccountCollectionOutcome> {
        info!("[{}] Collecting account {}", broker_name, account_number);

        let balance = self
            .registry
            .get_account_balance(broker_name, account_number)
            .await?;
        let Some(balance_outcome) = self
            .upsert_balance(account_number, balance_date, balance)
            .await?
        else {
            return Ok(AccountCollectionOutcome::Skipped);
        };

        let holdings = self
            .registry
            .get_account_holdings(broker_name, account_number)
            .await?;
        let holdings_written = self
            .replace_holdings(account_number, holdings)
            .await?
            .unwrap_or(0);

        info!(
            "[{}] Account {} collected: balance {:?}, {} holding(s)",
            broker_name, account_number, balance_outcome, holdings_written
        );
        Ok(AccountCollectionOutcome::Collected {
            balance: balance_outcome,
            holdings_written,
        })
    }

    /// Writes the balance for (account, date).
    ///
    /// Returns `None` without writing when the account is not registered.
    pub async fn upsert_balance(
        &self,
        account_number: &str,
        balance_date: NaiveDate,
        snapshot: BalanceSnapshot,
    ) -> Result<Option<UpsertOutcome>> {
        let Some(account) = self.lookup_account(account_number)? else {
            return Ok(None);
        };
        let outcome = self
            .balances
            .upsert_daily_balance(&account.id, balance_date, snapshot)
            .await?;
        debug!(
            "Balance for {} on {}: {:?}",
            account_number, balance_date, outcome
        );
        Ok(Some(outcome))
    }

    /// Replaces the current holdings of the account.
    ///
    /// Returns `None` without writing when the account is not registered.
    pub async fn replace_holdings(
        &self,
        account_number: &str,
        holdings: Vec<HoldingSnapshot>,
    ) -> Result<Option<usize>> {
        let Some(account) = self.lookup_account(account_number)? else {
            return Ok(None);
        };
        let written = self.holdings.replace_holdings(&account.id, holdings).await?;
        Ok(Some(written))
    }

    /// Collects every account the registry can list. One account failing
    /// never stops the run.
    pub async fn collect_all_accounts(&self) -> CollectionSummary {
        let accounts = self.registry.get_all_accounts().await;
        self.collect_accounts(&accounts, market_date_today()).await
    }

    /// Collects the given accounts sequentially, all dated `balance_date`.
    pub async fn collect_accounts(
        &self,
        accounts: &[AccountSnapshot],
        balance_date: NaiveDate,
    ) -> CollectionSummary {
        let mut summary = CollectionSummary::start(Utc::now());
        info!(
            "Collecting {} account(s) for {}",
            accounts.len(),
            balance_date
        );

        for account in accounts {
            let outcome = self
                .collect_account_data_on(&account.broker_name, &account.account_number, balance_date)
                .await
                .map_err(|e| {
                    error!(
                        "[{}] Collection failed for {}: {}",
                        account.broker_name, account.account_number, e
                    );
                    e.to_string()
                });
            summary.record(&account.broker_name, &account.account_number, outcome);
        }

        let summary = summary.finish(Utc::now());
        info!(
            "Collection finished: {:?} ({} ok, {} skipped, {} failed)",
            summary.status,
            summary.accounts_succeeded,
            summary.accounts_skipped,
            summary.accounts_failed()
        );
        summary
    }

    /// Appends the account's transactions in the inclusive date range and
    /// returns the inserted count. Unregistered accounts insert nothing.
    pub async fn collect_transaction_data(
        &self,
        broker_name: &str,
        account_number: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<usize> {
        let transactions = self
            .registry
            .get_account_transactions(broker_name, account_number, start_date, end_date)
            .await?;
        if transactions.is_empty() {
            info!(
                "[{}] No transactions for {} between {} and {}",
                broker_name, account_number, start_date, end_date
            );
            return Ok(0);
        }

        let Some(account) = self.lookup_account(account_number)? else {
            return Ok(0);
        };
        let inserted = self
            .transactions
            .append_transactions(&account.id, transactions)
            .await?;
        info!(
            "[{}] {} transaction(s) stored for {}",
            broker_name, inserted, account_number
        );
        Ok(inserted)
    }

    /// Registers or refreshes every account the registry can list.
    pub async fn register_accounts(&self) -> AccountsRegistered {
        let mut registered = AccountsRegistered::default();
        for snapshot in self.registry.get_all_accounts().await {
            let number = snapshot.account_number.clone();
            if let Err(e) = snapshot.validate() {
                warn!("Skipping account from {}: {}", snapshot.broker_name, e);
                registered.failed += 1;
                continue;
            }
            match self.accounts.upsert_from_snapshot(snapshot).await {
                Ok((_, UpsertOutcome::Inserted)) => registered.created += 1,
                Ok((_, UpsertOutcome::Updated)) => registered.updated += 1,
                Err(e) => {
                    error!("Failed to register account {}: {}", number, e);
                    registered.failed += 1;
                }
            }
        }
        info!(
            "Accounts registered: {} created, {} updated, {} failed",
            registered.created, registered.updated, registered.failed
        );
        registered
    }
}
