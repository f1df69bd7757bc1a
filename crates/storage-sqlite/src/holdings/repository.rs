use async_trait::async_trait;
use diesel::prelude::*;
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;

use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::IntoCore;
use crate::schema::holdings;
use crate::schema::holdings::dsl::*;
use crate::utils::INSERT_CHUNK_ROWS;

use super::model::HoldingDB;
use stockfolio_core::errors::Result;
use stockfolio_core::holdings::{HoldingRepositoryTrait, HoldingSnapshot, StoredHolding};

/// Repository for the "current holdings" view of each account.
pub struct HoldingRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl HoldingRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl HoldingRepositoryTrait for HoldingRepository {
    async fn replace_holdings(
        &self,
        input_account_id: &str,
        snapshots: Vec<HoldingSnapshot>,
    ) -> Result<usize> {
        let input_account_id = input_account_id.to_string();

        self.writer
            .exec(move |conn| {
                let now = chrono::Utc::now().naive_utc();

                // One row per symbol; a repeated symbol keeps its last entry.
                let mut position_of: HashMap<String, usize> = HashMap::new();
                let mut rows: Vec<HoldingDB> = Vec::with_capacity(snapshots.len());
                for snapshot in snapshots {
                    let row = HoldingDB::from_snapshot(&input_account_id, snapshot, now);
                    match position_of.get(&row.symbol) {
                        Some(&idx) => rows[idx] = row,
                        None => {
                            position_of.insert(row.symbol.clone(), rows.len());
                            rows.push(row);
                        }
                    }
                }

                let removed = diesel::delete(holdings.filter(account_id.eq(&input_account_id)))
                    .execute(conn)
                    .into_core()?;

                for chunk in rows.chunks(INSERT_CHUNK_ROWS) {
                    diesel::insert_into(holdings::table)
                        .values(chunk)
                        .execute(conn)
                        .into_core()?;
                }

                debug!(
                    "Replaced holdings for account {}: {} removed, {} written",
                    input_account_id,
                    removed,
                    rows.len()
                );
                Ok(rows.len())
            })
            .await
    }

    fn list_holdings(&self, input_account_id: &str) -> Result<Vec<StoredHolding>> {
        let mut conn = get_connection(&self.pool)?;

        let rows = holdings
            .filter(account_id.eq(input_account_id))
            .order(symbol.asc())
            .select(HoldingDB::as_select())
            .load::<HoldingDB>(&mut conn)
            .into_core()?;

        Ok(rows.into_iter().map(StoredHolding::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::AccountRepository;
    use crate::db::{create_pool, run_migrations, spawn_writer};
    use rust_decimal_macros::dec;
    use stockfolio_core::accounts::{AccountRepositoryTrait, AccountSnapshot};
    use tempfile::tempdir;

    async fn setup() -> (HoldingRepository, String, String, tempfile::TempDir) {
        let dir = tempdir().expect("Failed to create temp directory");
        let db_path = dir.path().join("test.db");
        let pool = create_pool(&db_path.to_string_lossy()).expect("Failed to create pool");
        run_migrations(&pool).expect("Failed to run migrations");
        let writer = spawn_writer((*pool).clone());

        let accounts = AccountRepository::new(Arc::clone(&pool), writer.clone());
        let (first, _) = accounts
            .upsert_from_snapshot(AccountSnapshot::new("1111111101", "a", "", "kis"))
            .await
            .unwrap();
        let (second, _) = accounts
            .upsert_from_snapshot(AccountSnapshot::new("2222222201", "b", "", "kiwoom"))
            .await
            .unwrap();

        (HoldingRepository::new(pool, writer), first.id, second.id, dir)
    }

    fn holding(code: &str, qty: i64) -> HoldingSnapshot {
        HoldingSnapshot {
            account_number: String::new(),
            symbol: code.to_string(),
            name: format!("stock {code}"),
            quantity: qty,
            average_price: dec!(50000),
            current_price: dec!(52300),
            evaluation_amount: dec!(52300) * rust_decimal::Decimal::from(qty),
            profit_loss: dec!(2300) * rust_decimal::Decimal::from(qty),
            profit_loss_rate: dec!(4.6),
        }
    }

    #[tokio::test]
    async fn test_replace_drops_symbols_missing_from_new_fetch() {
        let (repo, account, _, _dir) = setup().await;

        let written = repo
            .replace_holdings(
                &account,
                vec![holding("005930", 10), holding("000660", 3), holding("035420", 7)],
            )
            .await
            .unwrap();
        assert_eq!(written, 3);

        let written = repo
            .replace_holdings(&account, vec![holding("005930", 12)])
            .await
            .unwrap();
        assert_eq!(written, 1);

        let current = repo.list_holdings(&account).unwrap();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].symbol, "005930");
        assert_eq!(current[0].quantity, 12);
        assert_eq!(current[0].current_price, dec!(52300));
    }

    #[tokio::test]
    async fn test_replace_only_touches_target_account() {
        let (repo, first, second, _dir) = setup().await;

        repo.replace_holdings(&first, vec![holding("005930", 1)])
            .await
            .unwrap();
        repo.replace_holdings(&second, vec![holding("005930", 2), holding("000660", 2)])
            .await
            .unwrap();
        repo.replace_holdings(&first, Vec::new()).await.unwrap();

        assert!(repo.list_holdings(&first).unwrap().is_empty());
        assert_eq!(repo.list_holdings(&second).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_symbols_keep_last_entry() {
        let (repo, account, _, _dir) = setup().await;

        let written = repo
            .replace_holdings(&account, vec![holding("005930", 1), holding("005930", 9)])
            .await
            .unwrap();

        assert_eq!(written, 1);
        let current = repo.list_holdings(&account).unwrap();
        assert_eq!(current[0].quantity, 9);
    }
}
