//! Database model for daily balances.

use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;

use crate::utils::{date_to_text, decimal_to_text, text_to_date, text_to_decimal};
use stockfolio_core::balances::{BalanceSnapshot, DailyBalance};

#[derive(Queryable, Identifiable, Insertable, AsChangeset, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::daily_balances)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DailyBalanceDB {
    pub id: String,
    pub account_id: String,
    pub balance_date: String,
    pub cash_balance: String,
    pub stock_balance: String,
    pub total_balance: String,
    pub evaluation_amount: String,
    pub profit_loss: String,
    pub profit_loss_rate: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl DailyBalanceDB {
    pub fn new(
        account_id: &str,
        balance_date: NaiveDate,
        snapshot: &BalanceSnapshot,
        now: NaiveDateTime,
    ) -> Self {
        let mut row = Self {
            id: uuid::Uuid::new_v4().to_string(),
            account_id: account_id.to_string(),
            balance_date: date_to_text(balance_date),
            cash_balance: String::new(),
            stock_balance: String::new(),
            total_balance: String::new(),
            evaluation_amount: String::new(),
            profit_loss: String::new(),
            profit_loss_rate: String::new(),
            created_at: now,
            updated_at: now,
        };
        row.apply_snapshot(snapshot, now);
        row
    }

    /// Overwrites the amounts and bumps `updated_at`; identity and
    /// `created_at` are left alone.
    pub fn apply_snapshot(&mut self, snapshot: &BalanceSnapshot, now: NaiveDateTime) {
        self.cash_balance = decimal_to_text(snapshot.cash_balance);
        self.stock_balance = decimal_to_text(snapshot.stock_balance);
        self.total_balance = decimal_to_text(snapshot.total_balance);
        self.evaluation_amount = decimal_to_text(snapshot.evaluation_amount);
        self.profit_loss = decimal_to_text(snapshot.profit_loss);
        self.profit_loss_rate = decimal_to_text(snapshot.profit_loss_rate);
        self.updated_at = now;
    }
}

impl From<DailyBalanceDB> for DailyBalance {
    fn from(db: DailyBalanceDB) -> Self {
        Self {
            balance_date: text_to_date(&db.balance_date),
            cash_balance: text_to_decimal("cash_balance", &db.cash_balance),
            stock_balance: text_to_decimal("stock_balance", &db.stock_balance),
            total_balance: text_to_decimal("total_balance", &db.total_balance),
            evaluation_amount: text_to_decimal("evaluation_amount", &db.evaluation_amount),
            profit_loss: text_to_decimal("profit_loss", &db.profit_loss),
            profit_loss_rate: text_to_decimal("profit_loss_rate", &db.profit_loss_rate),
            id: db.id,
            account_id: db.account_id,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}
