//! Balance domain models.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Account summary as fetched from a broker, not yet reconciled.
///
/// The calendar day is attached at ingestion time, so a snapshot carries no
/// date of its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BalanceSnapshot {
    #[serde(default)]
    pub account_number: String,
    #[serde(default)]
    pub cash_balance: Decimal,
    #[serde(default)]
    pub stock_balance: Decimal,
    #[serde(default)]
    pub total_balance: Decimal,
    #[serde(default)]
    pub evaluation_amount: Decimal,
    #[serde(default)]
    pub profit_loss: Decimal,
    #[serde(default)]
    pub profit_loss_rate: Decimal,
}

impl BalanceSnapshot {
    /// A snapshot with every amount at zero.
    pub fn empty(account_number: impl Into<String>) -> Self {
        Self {
            account_number: account_number.into(),
            ..Default::default()
        }
    }

    /// Derives `stock_balance` as `total_balance - cash_balance`.
    ///
    /// Used for vendors that only report a total and the cash portion.
    pub fn with_derived_stock_balance(mut self) -> Self {
        self.stock_balance = self.total_balance - self.cash_balance;
        self
    }
}

/// One stored balance row per (account, calendar day).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBalance {
    pub id: String,
    pub account_id: String,
    pub balance_date: NaiveDate,
    pub cash_balance: Decimal,
    pub stock_balance: Decimal,
    pub total_balance: Decimal,
    pub evaluation_amount: Decimal,
    pub profit_loss: Decimal,
    pub profit_loss_rate: Decimal,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
