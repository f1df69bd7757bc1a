use async_trait::async_trait;
use chrono::NaiveDate;
use diesel::prelude::*;
use std::sync::Arc;

use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::IntoCore;
use crate::schema::transactions;
use crate::schema::transactions::dsl::*;
use crate::utils::{date_to_text, INSERT_CHUNK_ROWS};

use super::model::TransactionDB;
use stockfolio_core::errors::Result;
use stockfolio_core::transactions::{
    StoredTransaction, TransactionRecord, TransactionRepositoryTrait,
};

pub struct TransactionRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl TransactionRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl TransactionRepositoryTrait for TransactionRepository {
    async fn append_transactions(
        &self,
        input_account_id: &str,
        records: Vec<TransactionRecord>,
    ) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let input_account_id = input_account_id.to_string();

        self.writer
            .exec(move |conn| {
                let now = chrono::Utc::now().naive_utc();
                let rows: Vec<TransactionDB> = records
                    .into_iter()
                    .map(|r| TransactionDB::from_record(&input_account_id, r, now))
                    .collect();

                let mut inserted = 0;
                for chunk in rows.chunks(INSERT_CHUNK_ROWS) {
                    inserted += diesel::insert_into(transactions::table)
                        .values(chunk)
                        .execute(conn)
                        .into_core()?;
                }
                Ok(inserted)
            })
            .await
    }

    fn list_transactions(
        &self,
        input_account_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<StoredTransaction>> {
        let mut conn = get_connection(&self.pool)?;

        let rows = transactions
            .filter(account_id.eq(input_account_id))
            .filter(transaction_date.ge(date_to_text(start_date)))
            .filter(transaction_date.le(date_to_text(end_date)))
            .order((transaction_date.asc(), created_at.asc()))
            .select(TransactionDB::as_select())
            .load::<TransactionDB>(&mut conn)
            .into_core()?;

        rows.into_iter().map(StoredTransaction::try_from).collect()
    }

    fn list_symbol_transactions(
        &self,
        input_account_id: &str,
        input_symbol: &str,
    ) -> Result<Vec<StoredTransaction>> {
        let mut conn = get_connection(&self.pool)?;

        let rows = transactions
            .filter(account_id.eq(input_account_id))
            .filter(symbol.eq(input_symbol))
            .order((transaction_date.asc(), created_at.asc()))
            .select(TransactionDB::as_select())
            .load::<TransactionDB>(&mut conn)
            .into_core()?;

        rows.into_iter().map(StoredTransaction::try_from).collect()
    }
}
