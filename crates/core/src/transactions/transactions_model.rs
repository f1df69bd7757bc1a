//! Transaction domain models.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::{Error, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionDirection {
    Buy,
    Sell,
}

impl TransactionDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionDirection::Buy => "BUY",
            TransactionDirection::Sell => "SELL",
        }
    }
}

impl fmt::Display for TransactionDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" => Ok(TransactionDirection::Buy),
            "SELL" => Ok(TransactionDirection::Sell),
            other => Err(ValidationError::InvalidInput(format!(
                "Unknown transaction direction '{}'",
                other
            ))
            .into()),
        }
    }
}

/// A fetched trade. Every record is a new fact; nothing is updated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    #[serde(default)]
    pub account_number: String,
    pub transaction_date: NaiveDate,
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    pub direction: TransactionDirection,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub price: Decimal,
    #[serde(default)]
    pub amount: Decimal,
    #[serde(default)]
    pub fee: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredTransaction {
    pub id: String,
    pub account_id: String,
    pub transaction_date: NaiveDate,
    pub symbol: String,
    pub name: String,
    pub direction: TransactionDirection,
    pub quantity: i64,
    pub price: Decimal,
    pub amount: Decimal,
    pub fee: Decimal,
    pub created_at: NaiveDateTime,
}
