//! Aggregates derived from stored balances, holdings and transactions.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One calendar month of an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySummary {
    pub account_id: String,
    pub year: i32,
    pub month: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Total balance of the first stored day in the month.
    pub opening_balance: Decimal,
    /// Total balance of the last stored day in the month.
    pub closing_balance: Decimal,
    pub balance_change: Decimal,
    pub profit_loss: Decimal,
    pub profit_loss_rate: Decimal,
    pub transaction_count: usize,
    pub buy_count: usize,
    pub sell_count: usize,
    pub buy_amount: Decimal,
    pub sell_amount: Decimal,
    pub fees: Decimal,
    /// Holdings refreshed on or after the first day of the month.
    pub holdings_count: usize,
}

/// Trading result of one symbol over the account's whole history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockPerformance {
    pub account_id: String,
    pub symbol: String,
    pub name: String,
    pub total_buy_quantity: i64,
    pub total_sell_quantity: i64,
    pub net_quantity: i64,
    /// Sum of buy amounts.
    pub total_investment: Decimal,
    pub avg_buy_price: Decimal,
    pub avg_sell_price: Decimal,
    pub current_price: Decimal,
    pub current_value: Decimal,
    pub profit_loss: Decimal,
    pub profit_loss_rate: Decimal,
    pub first_buy_date: Option<NaiveDate>,
    pub last_sell_date: Option<NaiveDate>,
    pub holding_days: i64,
    pub avg_daily_return: Decimal,
    /// False when the symbol is no longer held and the value is estimated
    /// from the average buy price.
    pub is_held: bool,
}

/// Composition and return of an account on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioAnalysis {
    pub account_id: String,
    pub analysis_date: NaiveDate,
    pub total_assets: Decimal,
    /// Percent of total assets held as cash.
    pub cash_ratio: Decimal,
    /// Percent of total assets held in stock.
    pub stock_ratio: Decimal,
    pub holdings_count: usize,
    /// 10 points per recently refreshed holding, capped at 100.
    pub diversification_score: Decimal,
    pub total_return: Decimal,
    pub annualized_return: Decimal,
    /// Stored days the annualized return was computed over.
    pub history_days: usize,
}
