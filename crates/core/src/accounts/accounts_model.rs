//! Account domain models.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::{errors::ValidationError, Result};

/// An account as reported by a broker.
///
/// `account_number` is the natural key used to reconcile fetched data with
/// the accounts registered in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AccountSnapshot {
    pub account_number: String,
    #[serde(default)]
    pub account_name: String,
    #[serde(default)]
    pub account_type: String,
    /// Name of the registry entry that produced this snapshot.
    #[serde(default)]
    pub broker_name: String,
}

impl AccountSnapshot {
    pub fn new(
        account_number: impl Into<String>,
        account_name: impl Into<String>,
        account_type: impl Into<String>,
        broker_name: impl Into<String>,
    ) -> Self {
        Self {
            account_number: account_number.into(),
            account_name: account_name.into(),
            account_type: account_type.into(),
            broker_name: broker_name.into(),
        }
    }

    /// Validates the snapshot before it is registered.
    pub fn validate(&self) -> Result<()> {
        if self.account_number.trim().is_empty() {
            return Err(ValidationError::MissingField("account_number".to_string()).into());
        }
        Ok(())
    }
}

/// An account row owned by the store, identified by a surrogate key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredAccount {
    pub id: String,
    pub account_number: String,
    pub account_name: String,
    pub account_type: String,
    pub broker_name: String,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
