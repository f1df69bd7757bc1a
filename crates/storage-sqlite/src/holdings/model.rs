//! Database model for current holdings.

use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::utils::{decimal_to_text, text_to_decimal};
use stockfolio_core::holdings::{HoldingSnapshot, StoredHolding};

#[derive(Queryable, Identifiable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::holdings)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct HoldingDB {
    pub id: String,
    pub account_id: String,
    pub symbol: String,
    pub name: String,
    pub quantity: i64,
    pub average_price: String,
    pub current_price: String,
    pub evaluation_amount: String,
    pub profit_loss: String,
    pub profit_loss_rate: String,
    pub last_updated: NaiveDateTime,
}

impl HoldingDB {
    pub fn from_snapshot(account_id: &str, snapshot: HoldingSnapshot, now: NaiveDateTime) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            account_id: account_id.to_string(),
            symbol: snapshot.symbol,
            name: snapshot.name,
            quantity: snapshot.quantity,
            average_price: decimal_to_text(snapshot.average_price),
            current_price: decimal_to_text(snapshot.current_price),
            evaluation_amount: decimal_to_text(snapshot.evaluation_amount),
            profit_loss: decimal_to_text(snapshot.profit_loss),
            profit_loss_rate: decimal_to_text(snapshot.profit_loss_rate),
            last_updated: now,
        }
    }
}

impl From<HoldingDB> for StoredHolding {
    fn from(db: HoldingDB) -> Self {
        Self {
            average_price: text_to_decimal("average_price", &db.average_price),
            current_price: text_to_decimal("current_price", &db.current_price),
            evaluation_amount: text_to_decimal("evaluation_amount", &db.evaluation_amount),
            profit_loss: text_to_decimal("profit_loss", &db.profit_loss),
            profit_loss_rate: text_to_decimal("profit_loss_rate", &db.profit_loss_rate),
            id: db.id,
            account_id: db.account_id,
            symbol: db.symbol,
            name: db.name,
            quantity: db.quantity,
            last_updated: db.last_updated,
        }
    }
}
