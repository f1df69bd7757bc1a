//! Line-oriented JSON protocol between a subprocess broker client and its worker.
//!
//! The worker is invoked as `<worker-binary> <command> [account_number]` and
//! prints exactly one JSON document on stdout:
//!
//! ```text
//! {"success": true,  "data": <command specific>}
//! {"success": false, "error": "<message>"}
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{Error, ValidationError};

/// Commands understood by the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerCommand {
    GetAccounts,
    GetBalance,
    GetHoldings,
}

impl WorkerCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerCommand::GetAccounts => "get_accounts",
            WorkerCommand::GetBalance => "get_balance",
            WorkerCommand::GetHoldings => "get_holdings",
        }
    }

    /// Whether the command takes an account number argument.
    pub fn requires_account(&self) -> bool {
        !matches!(self, WorkerCommand::GetAccounts)
    }
}

impl fmt::Display for WorkerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkerCommand {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "get_accounts" => Ok(WorkerCommand::GetAccounts),
            "get_balance" => Ok(WorkerCommand::GetBalance),
            "get_holdings" => Ok(WorkerCommand::GetHoldings),
            other => Err(ValidationError::InvalidInput(format!("Unknown command: {}", other)).into()),
        }
    }
}

/// The single document a worker writes to stdout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> WorkerResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}
