//! Collection run domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of writing a keyed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Overall status of a multi-account collection run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    /// Every account was collected.
    Succeeded,
    /// Some accounts failed, at least one succeeded.
    PartiallySucceeded,
    /// Every attempted account failed.
    Failed,
    /// No account was available to collect.
    NoAccounts,
    /// Accounts were listed but none is registered; nothing was written.
    Skipped,
}

/// What happened to a single account during collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountCollectionOutcome {
    /// Balance and holdings were persisted.
    Collected {
        balance: UpsertOutcome,
        holdings_written: usize,
    },
    /// The account is not registered in the store; nothing was written.
    Skipped,
}

/// Per-account failure kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountFailure {
    pub broker_name: String,
    pub account_number: String,
    pub error: String,
}

/// Summary of a multi-account collection run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionSummary {
    pub status: RunStatus,
    pub accounts_total: usize,
    pub accounts_succeeded: usize,
    pub accounts_skipped: usize,
    pub failures: Vec<AccountFailure>,
    pub balances_written: usize,
    pub holdings_written: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CollectionSummary {
    pub fn start(started_at: DateTime<Utc>) -> Self {
        Self {
            status: RunStatus::NoAccounts,
            accounts_total: 0,
            accounts_succeeded: 0,
            accounts_skipped: 0,
            failures: Vec::new(),
            balances_written: 0,
            holdings_written: 0,
            started_at,
            finished_at: started_at,
        }
    }

    /// Records the outcome of one account.
    pub fn record(
        &mut self,
        broker_name: &str,
        account_number: &str,
        outcome: Result<AccountCollectionOutcome, String>,
    ) {
        self.accounts_total += 1;
        match outcome {
            Ok(AccountCollectionOutcome::Collected {
                holdings_written, ..
            }) => {
                self.accounts_succeeded += 1;
                self.balances_written += 1;
                self.holdings_written += holdings_written;
            }
            Ok(AccountCollectionOutcome::Skipped) => {
                self.accounts_skipped += 1;
            }
            Err(error) => self.failures.push(AccountFailure {
                broker_name: broker_name.to_string(),
                account_number: account_number.to_string(),
                error,
            }),
        }
    }

    /// Closes the run and derives its status from the recorded outcomes.
    ///
    /// Skipped accounts count as neither success nor failure.
    pub fn finish(mut self, finished_at: DateTime<Utc>) -> Self {
        self.finished_at = finished_at;
        let failed = self.failures.len();
        self.status = if self.accounts_total == 0 {
            RunStatus::NoAccounts
        } else if failed == 0 && self.accounts_succeeded == 0 {
            RunStatus::Skipped
        } else if failed == 0 {
            RunStatus::Succeeded
        } else if self.accounts_succeeded == 0 {
            RunStatus::Failed
        } else {
            RunStatus::PartiallySucceeded
        };
        self
    }

    pub fn accounts_failed(&self) -> usize {
        self.failures.len()
    }
}

/// Result of explicitly registering broker accounts in the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountsRegistered {
    pub created: usize,
    pub updated: usize,
    pub failed: usize,
}
