//! Database model for transactions.

use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::utils::{date_to_text, decimal_to_text, text_to_date, text_to_decimal};
use stockfolio_core::errors::Error;
use stockfolio_core::transactions::{StoredTransaction, TransactionRecord};

#[derive(Queryable, Identifiable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::transactions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TransactionDB {
    pub id: String,
    pub account_id: String,
    pub transaction_date: String,
    pub symbol: String,
    pub name: String,
    pub direction: String,
    pub quantity: i64,
    pub price: String,
    pub amount: String,
    pub fee: String,
    pub created_at: NaiveDateTime,
}

impl TransactionDB {
    pub fn from_record(account_id: &str, record: TransactionRecord, now: NaiveDateTime) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            account_id: account_id.to_string(),
            transaction_date: date_to_text(record.transaction_date),
            symbol: record.symbol,
            name: record.name,
            direction: record.direction.as_str().to_string(),
            quantity: record.quantity,
            price: decimal_to_text(record.price),
            amount: decimal_to_text(record.amount),
            fee: decimal_to_text(record.fee),
            created_at: now,
        }
    }
}

impl TryFrom<TransactionDB> for StoredTransaction {
    type Error = Error;

    fn try_from(db: TransactionDB) -> Result<Self, Self::Error> {
        Ok(Self {
            transaction_date: text_to_date(&db.transaction_date),
            direction: db.direction.parse()?,
            price: text_to_decimal("price", &db.price),
            amount: text_to_decimal("amount", &db.amount),
            fee: text_to_decimal("fee", &db.fee),
            id: db.id,
            account_id: db.account_id,
            symbol: db.symbol,
            name: db.name,
            quantity: db.quantity,
            created_at: db.created_at,
        })
    }
}
