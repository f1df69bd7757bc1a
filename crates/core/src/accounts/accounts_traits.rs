//! Account repository trait.

use async_trait::async_trait;

use super::accounts_model::{AccountSnapshot, RegisteredAccount};
use crate::errors::Result;
use crate::UpsertOutcome;

/// Persistence contract for registered accounts.
///
/// Surrogate keys are assigned by the implementation; callers only ever know
/// the broker's account number.
#[async_trait]
pub trait AccountRepositoryTrait: Send + Sync {
    /// Looks up an account by its natural key.
    fn find_by_number(&self, account_number: &str) -> Result<Option<RegisteredAccount>>;

    /// Lists every registered account ordered by broker and account number.
    fn list(&self) -> Result<Vec<RegisteredAccount>>;

    /// Registers an account or refreshes its descriptive fields.
    async fn upsert_from_snapshot(
        &self,
        snapshot: AccountSnapshot,
    ) -> Result<(RegisteredAccount, UpsertOutcome)>;
}
