use async_trait::async_trait;
use diesel::prelude::*;
use std::sync::Arc;

use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::IntoCore;
use crate::schema::accounts;
use crate::schema::accounts::dsl::*;

use super::model::AccountDB;
use stockfolio_core::accounts::{AccountRepositoryTrait, AccountSnapshot, RegisteredAccount};
use stockfolio_core::errors::Result;
use stockfolio_core::UpsertOutcome;

/// Repository for registered accounts.
pub struct AccountRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl AccountRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl AccountRepositoryTrait for AccountRepository {
    fn find_by_number(&self, number: &str) -> Result<Option<RegisteredAccount>> {
        let mut conn = get_connection(&self.pool)?;

        let account = accounts
            .filter(account_number.eq(number))
            .select(AccountDB::as_select())
            .first::<AccountDB>(&mut conn)
            .optional()
            .into_core()?;

        Ok(account.map(RegisteredAccount::from))
    }

    fn list(&self) -> Result<Vec<RegisteredAccount>> {
        let mut conn = get_connection(&self.pool)?;

        let results = accounts
            .select(AccountDB::as_select())
            .order((broker_name.asc(), account_number.asc()))
            .load::<AccountDB>(&mut conn)
            .into_core()?;

        Ok(results.into_iter().map(RegisteredAccount::from).collect())
    }

    async fn upsert_from_snapshot(
        &self,
        snapshot: AccountSnapshot,
    ) -> Result<(RegisteredAccount, UpsertOutcome)> {
        snapshot.validate()?;

        self.writer
            .exec(move |conn| {
                let now = chrono::Utc::now().naive_utc();
                let existing = accounts
                    .filter(account_number.eq(&snapshot.account_number))
                    .select(AccountDB::as_select())
                    .first::<AccountDB>(conn)
                    .optional()
                    .into_core()?;

                match existing {
                    Some(mut account_db) => {
                        account_db.merge_snapshot(snapshot, now);
                        diesel::update(accounts.find(&account_db.id))
                            .set(&account_db)
                            .execute(conn)
                            .into_core()?;
                        Ok((account_db.into(), UpsertOutcome::Updated))
                    }
                    None => {
                        let account_db = AccountDB::from_snapshot(snapshot, now);
                        diesel::insert_into(accounts::table)
                            .values(&account_db)
                            .execute(conn)
                            .into_core()?;
                        Ok((account_db.into(), UpsertOutcome::Inserted))
                    }
                }
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool, run_migrations, spawn_writer};
    use tempfile::tempdir;

    async fn create_test_repository() -> (AccountRepository, tempfile::TempDir) {
        let temp_dir = tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test.db");
        let pool = create_pool(&db_path.to_string_lossy()).expect("Failed to create pool");
        run_migrations(&pool).expect("Failed to run migrations");
        let writer = spawn_writer((*pool).clone());
        (AccountRepository::new(pool, writer), temp_dir)
    }

    #[tokio::test]
    async fn test_upsert_registers_then_updates() {
        let (repo, _dir) = create_test_repository().await;

        let (created, outcome) = repo
            .upsert_from_snapshot(AccountSnapshot::new(
                "1234567801",
                "한국투자증권 계좌",
                "일반",
                "한국투자증권",
            ))
            .await
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::Inserted);

        let (updated, outcome) = repo
            .upsert_from_snapshot(AccountSnapshot::new("1234567801", "Renamed", "", ""))
            .await
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::Updated);
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.account_name, "Renamed");
        assert_eq!(updated.broker_name, "한국투자증권");

        assert_eq!(repo.list().unwrap().len(), 1);
        let found = repo.find_by_number("1234567801").unwrap().unwrap();
        assert_eq!(found.account_name, "Renamed");
        assert!(repo.find_by_number("0000000000").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_blank_account_number_is_rejected() {
        let (repo, _dir) = create_test_repository().await;
        let result = repo
            .upsert_from_snapshot(AccountSnapshot::new(" ", "x", "x", "x"))
            .await;
        assert!(result.is_err());
        assert!(repo.list().unwrap().is_empty());
    }
}
