use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use log::{debug, warn};
use rust_decimal::{Decimal, MathematicalOps};

use super::analytics_model::{MonthlySummary, PortfolioAnalysis, StockPerformance};
use crate::balances::BalanceRepositoryTrait;
use crate::errors::{Result, ValidationError};
use crate::holdings::HoldingRepositoryTrait;
use crate::transactions::{TransactionDirection, TransactionRepositoryTrait};

/// Holdings refreshed within this many days count toward a portfolio analysis.
const HOLDING_FRESHNESS_DAYS: i64 = 7;
/// Look-back window of the annualized return.
const RETURN_WINDOW_DAYS: i64 = 365;
const RATE_DECIMAL_PLACES: u32 = 4;

pub trait AnalyticsServiceTrait: Send + Sync {
    /// Summary of one calendar month, or `None` when no balance was stored
    /// during that month.
    fn monthly_summary(
        &self,
        account_id: &str,
        year: i32,
        month: u32,
    ) -> Result<Option<MonthlySummary>>;

    /// Performance of one symbol, or `None` when it was never traded.
    fn stock_performance(
        &self,
        account_id: &str,
        symbol: &str,
        as_of: NaiveDate,
    ) -> Result<Option<StockPerformance>>;

    /// Analysis of one day, or `None` when no balance exists for that day.
    fn portfolio_analysis(
        &self,
        account_id: &str,
        analysis_date: NaiveDate,
    ) -> Result<Option<PortfolioAnalysis>>;
}

/// Computes aggregates on demand from the stored facts. Nothing is persisted.
pub struct AnalyticsService {
    balance_repository: Arc<dyn BalanceRepositoryTrait>,
    holding_repository: Arc<dyn HoldingRepositoryTrait>,
    transaction_repository: Arc<dyn TransactionRepositoryTrait>,
}

impl AnalyticsService {
    pub fn new(
        balance_repository: Arc<dyn BalanceRepositoryTrait>,
        holding_repository: Arc<dyn HoldingRepositoryTrait>,
        transaction_repository: Arc<dyn TransactionRepositoryTrait>,
    ) -> Self {
        Self {
            balance_repository,
            holding_repository,
            transaction_repository,
        }
    }

    fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate)> {
        let invalid = || ValidationError::InvalidInput(format!("invalid month {year}-{month:02}"));
        let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
        let next_month = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        };
        let end = next_month
            .and_then(|d| d.pred_opt())
            .ok_or_else(invalid)?;
        Ok((start, end))
    }

    /// Compound yearly growth between the first and last balance, in percent.
    fn annualized_return(start_total: Decimal, end_total: Decimal, days: i64) -> Decimal {
        if days <= 0 || start_total <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let exponent = Decimal::from(RETURN_WINDOW_DAYS) / Decimal::from(days);
        end_total
            .checked_div(start_total)
            .and_then(|growth| growth.checked_powd(exponent))
            .and_then(|factor| (factor - Decimal::ONE).checked_mul(Decimal::ONE_HUNDRED))
            .map(|rate| rate.round_dp(RATE_DECIMAL_PLACES))
            .unwrap_or(Decimal::ZERO)
    }
}

impl AnalyticsServiceTrait for AnalyticsService {
    fn monthly_summary(
        &self,
        account_id: &str,
        year: i32,
        month: u32,
    ) -> Result<Option<MonthlySummary>> {
        let (start_date, end_date) = Self::month_bounds(year, month)?;

        let balances = self
            .balance_repository
            .list_daily_balances(account_id, start_date, end_date)?;
        let (Some(first), Some(last)) = (balances.first(), balances.last()) else {
            warn!(
                "No balances stored for account {} in {}-{:02}",
                account_id, year, month
            );
            return Ok(None);
        };

        let transactions = self
            .transaction_repository
            .list_transactions(account_id, start_date, end_date)?;
        let holdings_count = self
            .holding_repository
            .list_holdings(account_id)?
            .iter()
            .filter(|h| h.last_updated.date() >= start_date)
            .count();

        let mut summary = MonthlySummary {
            account_id: account_id.to_string(),
            year,
            month,
            start_date,
            end_date,
            opening_balance: first.total_balance,
            closing_balance: last.total_balance,
            balance_change: last.total_balance - first.total_balance,
            profit_loss: last.profit_loss,
            profit_loss_rate: last.profit_loss_rate,
            transaction_count: transactions.len(),
            buy_count: 0,
            sell_count: 0,
            buy_amount: Decimal::ZERO,
            sell_amount: Decimal::ZERO,
            fees: Decimal::ZERO,
            holdings_count,
        };
        for transaction in &transactions {
            match transaction.direction {
                TransactionDirection::Buy => {
                    summary.buy_count += 1;
                    summary.buy_amount += transaction.amount;
                }
                TransactionDirection::Sell => {
                    summary.sell_count += 1;
                    summary.sell_amount += transaction.amount;
                }
            }
            summary.fees += transaction.fee;
        }

        debug!(
            "Monthly summary for {} {}-{:02}: {} balance day(s), {} transaction(s)",
            account_id,
            year,
            month,
            balances.len(),
            transactions.len()
        );
        Ok(Some(summary))
    }

    fn stock_performance(
        &self,
        account_id: &str,
        symbol: &str,
        as_of: NaiveDate,
    ) -> Result<Option<StockPerformance>> {
        let transactions = self
            .transaction_repository
            .list_symbol_transactions(account_id, symbol)?;
        if transactions.is_empty() {
            warn!("No transactions stored for {} in account {}", symbol, account_id);
            return Ok(None);
        }

        let mut buy_quantity = 0i64;
        let mut sell_quantity = 0i64;
        let mut buy_amount = Decimal::ZERO;
        let mut sell_amount = Decimal::ZERO;
        let mut first_buy_date: Option<NaiveDate> = None;
        let mut last_sell_date: Option<NaiveDate> = None;
        for transaction in &transactions {
            let day = transaction.transaction_date;
            match transaction.direction {
                TransactionDirection::Buy => {
                    buy_quantity += transaction.quantity;
                    buy_amount += transaction.amount;
                    first_buy_date = Some(first_buy_date.map_or(day, |d| d.min(day)));
                }
                TransactionDirection::Sell => {
                    sell_quantity += transaction.quantity;
                    sell_amount += transaction.amount;
                    last_sell_date = Some(last_sell_date.map_or(day, |d| d.max(day)));
                }
            }
        }

        let avg_buy_price = average(buy_amount, buy_quantity);
        let avg_sell_price = average(sell_amount, sell_quantity);
        let net_quantity = buy_quantity - sell_quantity;
        let cost_basis = avg_buy_price * Decimal::from(net_quantity);

        let holding = self
            .holding_repository
            .list_holdings(account_id)?
            .into_iter()
            .find(|h| h.symbol == symbol);
        let (current_price, current_value) = match &holding {
            Some(h) => (h.current_price, h.evaluation_amount),
            None => (avg_buy_price, cost_basis),
        };
        let profit_loss = current_value - cost_basis;
        let profit_loss_rate = percent(profit_loss, cost_basis);

        // A position still open is measured up to `as_of`.
        let holding_days = first_buy_date
            .map(|first| {
                let end = match last_sell_date {
                    Some(last) if net_quantity <= 0 => last,
                    _ => as_of,
                };
                (end - first).num_days().max(0)
            })
            .unwrap_or(0);
        let avg_daily_return = if holding_days > 0 {
            (profit_loss_rate / Decimal::from(holding_days)).round_dp(RATE_DECIMAL_PLACES)
        } else {
            Decimal::ZERO
        };

        let name = holding
            .as_ref()
            .map(|h| h.name.clone())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| transactions[0].name.clone());

        Ok(Some(StockPerformance {
            account_id: account_id.to_string(),
            symbol: symbol.to_string(),
            name,
            total_buy_quantity: buy_quantity,
            total_sell_quantity: sell_quantity,
            net_quantity,
            total_investment: buy_amount,
            avg_buy_price,
            avg_sell_price,
            current_price,
            current_value,
            profit_loss,
            profit_loss_rate,
            first_buy_date,
            last_sell_date,
            holding_days,
            avg_daily_return,
            is_held: holding.is_some(),
        }))
    }

    fn portfolio_analysis(
        &self,
        account_id: &str,
        analysis_date: NaiveDate,
    ) -> Result<Option<PortfolioAnalysis>> {
        let Some(balance) = self
            .balance_repository
            .get_daily_balance(account_id, analysis_date)?
        else {
            warn!(
                "No balance stored for account {} on {}",
                account_id, analysis_date
            );
            return Ok(None);
        };

        let fresh_since = analysis_date - Duration::days(HOLDING_FRESHNESS_DAYS);
        let holdings_count = self
            .holding_repository
            .list_holdings(account_id)?
            .iter()
            .filter(|h| h.last_updated.date() >= fresh_since)
            .count();

        let history = self.balance_repository.list_daily_balances(
            account_id,
            analysis_date - Duration::days(RETURN_WINDOW_DAYS),
            analysis_date,
        )?;
        let total_return = balance.profit_loss_rate;
        let annualized_return = match (history.first(), history.last()) {
            (Some(first), Some(last)) if history.len() >= 2 => Self::annualized_return(
                first.total_balance,
                last.total_balance,
                (last.balance_date - first.balance_date).num_days(),
            ),
            _ => total_return,
        };

        let total_assets = balance.total_balance;
        Ok(Some(PortfolioAnalysis {
            account_id: account_id.to_string(),
            analysis_date,
            total_assets,
            cash_ratio: percent(balance.cash_balance, total_assets),
            stock_ratio: percent(balance.stock_balance, total_assets),
            holdings_count,
            diversification_score: Decimal::from(holdings_count.saturating_mul(10).min(100)),
            total_return,
            annualized_return,
            history_days: history.len(),
        }))
    }
}

/// `part` as a percentage of `whole`; zero when `whole` is not positive.
fn percent(part: Decimal, whole: Decimal) -> Decimal {
    if whole <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    part.checked_div(whole)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .map(|rate| rate.round_dp(RATE_DECIMAL_PLACES))
        .unwrap_or(Decimal::ZERO)
}

fn average(total: Decimal, quantity: i64) -> Decimal {
    if quantity <= 0 {
        return Decimal::ZERO;
    }
    total
        .checked_div(Decimal::from(quantity))
        .map(|avg| avg.round_dp(RATE_DECIMAL_PLACES))
        .unwrap_or(Decimal::ZERO)
}
