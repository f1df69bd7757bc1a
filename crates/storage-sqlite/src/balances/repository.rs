use async_trait::async_trait;
use chrono::NaiveDate;
use diesel::prelude::*;
use std::sync::Arc;

use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::IntoCore;
use crate::schema::daily_balances;
use crate::schema::daily_balances::dsl::*;
use crate::utils::date_to_text;

use super::model::DailyBalanceDB;
use stockfolio_core::balances::{BalanceRepositoryTrait, BalanceSnapshot, DailyBalance};
use stockfolio_core::errors::Result;
use stockfolio_core::UpsertOutcome;

/// Repository for per-day account balances.
pub struct BalanceRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl BalanceRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl BalanceRepositoryTrait for BalanceRepository {
    async fn upsert_daily_balance(
        &self,
        input_account_id: &str,
        input_date: NaiveDate,
        snapshot: BalanceSnapshot,
    ) -> Result<UpsertOutcome> {
        let input_account_id = input_account_id.to_string();

        self.writer
            .exec(move |conn| {
                let now = chrono::Utc::now().naive_utc();
                let date_text = date_to_text(input_date);

                let existing = daily_balances
                    .filter(account_id.eq(&input_account_id))
                    .filter(balance_date.eq(&date_text))
                    .select(DailyBalanceDB::as_select())
                    .first::<DailyBalanceDB>(conn)
                    .optional()
                    .into_core()?;

                match existing {
                    Some(mut row) => {
                        row.apply_snapshot(&snapshot, now);
                        diesel::update(daily_balances.find(&row.id))
                            .set(&row)
                            .execute(conn)
                            .into_core()?;
                        Ok(UpsertOutcome::Updated)
                    }
                    None => {
                        let row = DailyBalanceDB::new(&input_account_id, input_date, &snapshot, now);
                        diesel::insert_into(daily_balances::table)
                            .values(&row)
                            .execute(conn)
                            .into_core()?;
                        Ok(UpsertOutcome::Inserted)
                    }
                }
            })
            .await
    }

    fn get_daily_balance(
        &self,
        input_account_id: &str,
        input_date: NaiveDate,
    ) -> Result<Option<DailyBalance>> {
        let mut conn = get_connection(&self.pool)?;

        let row = daily_balances
            .filter(account_id.eq(input_account_id))
            .filter(balance_date.eq(date_to_text(input_date)))
            .select(DailyBalanceDB::as_select())
            .first::<DailyBalanceDB>(&mut conn)
            .optional()
            .into_core()?;

        Ok(row.map(DailyBalance::from))
    }

    fn list_daily_balances(
        &self,
        input_account_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<DailyBalance>> {
        let mut conn = get_connection(&self.pool)?;

        let rows = daily_balances
            .filter(account_id.eq(input_account_id))
            .filter(balance_date.ge(date_to_text(start_date)))
            .filter(balance_date.le(date_to_text(end_date)))
            .order(balance_date.asc())
            .select(DailyBalanceDB::as_select())
            .load::<DailyBalanceDB>(&mut conn)
            .into_core()?;

        Ok(rows.into_iter().map(DailyBalance::from).collect())
    }
}
