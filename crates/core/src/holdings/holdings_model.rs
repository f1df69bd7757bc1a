//! Holding domain models.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single position as fetched from a broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct HoldingSnapshot {
    #[serde(default)]
    pub account_number: String,
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub average_price: Decimal,
    #[serde(default)]
    pub current_price: Decimal,
    #[serde(default)]
    pub evaluation_amount: Decimal,
    #[serde(default)]
    pub profit_loss: Decimal,
    #[serde(default)]
    pub profit_loss_rate: Decimal,
}

/// A row of the current holdings view for an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredHolding {
    pub id: String,
    pub account_id: String,
    pub symbol: String,
    pub name: String,
    pub quantity: i64,
    pub average_price: Decimal,
    pub current_price: Decimal,
    pub evaluation_amount: Decimal,
    pub profit_loss: Decimal,
    pub profit_loss_rate: Decimal,
    pub last_updated: NaiveDateTime,
}

/// Price view of a held symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockQuote {
    pub symbol: String,
    pub name: String,
    pub current_price: Decimal,
    pub change_rate: Decimal,
    /// Current price minus average purchase price.
    pub change_price: Decimal,
    pub quantity: i64,
    pub evaluation_amount: Decimal,
    pub profit_loss: Decimal,
}

impl From<&HoldingSnapshot> for StockQuote {
    fn from(holding: &HoldingSnapshot) -> Self {
        Self {
            symbol: holding.symbol.clone(),
            name: holding.name.clone(),
            current_price: holding.current_price,
            change_rate: holding.profit_loss_rate,
            change_price: holding.current_price - holding.average_price,
            quantity: holding.quantity,
            evaluation_amount: holding.evaluation_amount,
            profit_loss: holding.profit_loss,
        }
    }
}
