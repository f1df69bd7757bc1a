//! Database model for accounts.

use chrono::NaiveDateTime;
use diesel::prelude::*;

use stockfolio_core::accounts::{AccountSnapshot, RegisteredAccount};

#[derive(
    Queryable, Identifiable, Insertable, AsChangeset, Selectable, PartialEq, Debug, Clone,
)]
#[diesel(table_name = crate::schema::accounts)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AccountDB {
    pub id: String,
    pub account_number: String,
    pub account_name: String,
    pub account_type: String,
    pub broker_name: String,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl AccountDB {
    pub fn from_snapshot(snapshot: AccountSnapshot, now: NaiveDateTime) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            account_number: snapshot.account_number,
            account_name: snapshot.account_name,
            account_type: snapshot.account_type,
            broker_name: snapshot.broker_name,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Refreshes descriptive fields. Blank values in the snapshot keep the
    /// stored value.
    pub fn merge_snapshot(&mut self, snapshot: AccountSnapshot, now: NaiveDateTime) {
        let keep = |current: &mut String, incoming: String| {
            if !incoming.trim().is_empty() {
                *current = incoming;
            }
        };
        keep(&mut self.account_name, snapshot.account_name);
        keep(&mut self.account_type, snapshot.account_type);
        keep(&mut self.broker_name, snapshot.broker_name);
        self.is_active = true;
        self.updated_at = now;
    }
}

impl From<AccountDB> for RegisteredAccount {
    fn from(db: AccountDB) -> Self {
        Self {
            id: db.id,
            account_number: db.account_number,
            account_name: db.account_name,
            account_type: db.account_type,
            broker_name: db.broker_name,
            is_active: db.is_active,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}
