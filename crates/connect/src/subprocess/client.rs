//! [`BrokerClient`] that spawns one worker process per call.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use log::{debug, error, info, warn};
use serde::de::DeserializeOwned;
use tokio::process::Command;

use crate::broker::BrokerClient;
use stockfolio_core::accounts::AccountSnapshot;
use stockfolio_core::balances::BalanceSnapshot;
use stockfolio_core::brokers::{ApiKind, WorkerCommand, WorkerResponse};
use stockfolio_core::config::BrokerConfig;
use stockfolio_core::errors::{BrokerError, Error, Result};
use stockfolio_core::holdings::HoldingSnapshot;
use stockfolio_core::transactions::TransactionRecord;

/// Bridges to a vendor API that only runs inside a separate worker binary.
///
/// There is no persistent session: `connect` only checks that the worker can
/// be launched. Account lists are cached until `disconnect`.
pub struct SubprocessBrokerClient {
    name: String,
    worker_path: PathBuf,
    worker_args: Vec<String>,
    worker_timeout: Duration,
    connected: RwLock<bool>,
    accounts: RwLock<Option<Vec<AccountSnapshot>>>,
}

impl SubprocessBrokerClient {
    pub fn from_config(config: &BrokerConfig) -> Result<Self> {
        let worker_path = config.api_settings.worker_path.clone().ok_or_else(|| {
            Error::MissingConfigKey(format!("brokers[{}].api_settings.worker_path", config.name))
        })?;

        Ok(Self {
            name: config.name.clone(),
            worker_path,
            worker_args: config.api_settings.worker_args.clone(),
            worker_timeout: Duration::from_secs(config.api_settings.worker_timeout),
            connected: RwLock::new(false),
            accounts: RwLock::new(None),
        })
    }

    fn set_connected(&self, connected: bool) {
        *self.connected.write().unwrap_or_else(|e| e.into_inner()) = connected;
    }

    fn cached_accounts(&self) -> Option<Vec<AccountSnapshot>> {
        self.accounts
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn set_cached_accounts(&self, accounts: Option<Vec<AccountSnapshot>>) {
        *self.accounts.write().unwrap_or_else(|e| e.into_inner()) = accounts;
    }

    /// Locates the worker binary. Bare program names are looked up on `PATH`
    /// the same way the process launcher does.
    fn resolve_worker(&self) -> Option<PathBuf> {
        resolve_program(&self.worker_path, std::env::var_os("PATH").as_deref())
    }

    /// Runs the worker with `[worker_args.., command, args..]` and decodes
    /// its single JSON document.
    ///
    /// A timeout kills the child and is not retried. Non-zero exits and
    /// undecodable output carry the raw streams for diagnosis.
    pub async fn run_worker<T: DeserializeOwned>(
        &self,
        command: WorkerCommand,
        args: &[&str],
    ) -> Result<T> {
        debug!(
            "[{}] Running worker {} {}",
            self.name,
            self.worker_path.display(),
            command
        );

        let child = Command::new(&self.worker_path)
            .args(&self.worker_args)
            .arg(command.as_str())
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| BrokerError::Worker {
                code: None,
                detail: format!("failed to launch {}: {e}", self.worker_path.display()),
            })?;

        let output = match tokio::time::timeout(self.worker_timeout, child.wait_with_output()).await
        {
            Ok(output) => output.map_err(|e| BrokerError::Worker {
                code: None,
                detail: format!("failed to collect worker output: {e}"),
            })?,
            Err(_) => {
                error!(
                    "[{}] Worker {} exceeded {}s",
                    self.name,
                    command,
                    self.worker_timeout.as_secs()
                );
                return Err(BrokerError::Timeout("Worker".to_string()).into());
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            debug!("[{}] worker stderr: {}", self.name, stderr.trim());
        }

        if !output.status.success() {
            // Workers report failures as JSON too; prefer that message.
            if let Ok(WorkerResponse {
                success: false,
                error: Some(message),
                ..
            }) = serde_json::from_str::<WorkerResponse<serde_json::Value>>(stdout.trim())
            {
                return Err(BrokerError::Worker {
                    code: output.status.code(),
                    detail: format!("{message} ({})", diagnostic(&stdout, &stderr)),
                }
                .into());
            }
            return Err(BrokerError::Worker {
                code: output.status.code(),
                detail: diagnostic(&stdout, &stderr),
            }
            .into());
        }

        let response: WorkerResponse<T> =
            serde_json::from_str(stdout.trim()).map_err(|e| {
                BrokerError::MalformedResponse(format!(
                    "worker output is not a result document ({e}): {}",
                    diagnostic(&stdout, &stderr)
                ))
            })?;

        if !response.success {
            let message = response
                .error
                .unwrap_or_else(|| "worker reported failure without a message".to_string());
            return Err(BrokerError::WorkerFailed(message).into());
        }

        response.data.ok_or_else(|| {
            BrokerError::MalformedResponse(format!("worker {command} returned no data")).into()
        })
    }

    async fn ensure_connected(&self) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }
        self.connect().await.map(|_| ())
    }
}

#[async_trait]
impl BrokerClient for SubprocessBrokerClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn api_kind(&self) -> ApiKind {
        ApiKind::Subprocess
    }

    async fn connect(&self) -> Result<bool> {
        let Some(resolved) = self.resolve_worker() else {
            self.set_connected(false);
            return Err(BrokerError::Worker {
                code: None,
                detail: format!("worker not found at {}", self.worker_path.display()),
            }
            .into());
        };
        self.set_connected(true);
        info!("[{}] Worker available at {}", self.name, resolved.display());
        Ok(true)
    }

    async fn disconnect(&self) -> Result<bool> {
        self.set_connected(false);
        self.set_cached_accounts(None);
        info!("[{}] Disconnected", self.name);
        Ok(true)
    }

    fn is_connected(&self) -> bool {
        *self.connected.read().unwrap_or_else(|e| e.into_inner())
    }

    async fn get_accounts(&self) -> Result<Vec<AccountSnapshot>> {
        self.ensure_connected().await?;
        if let Some(accounts) = self.cached_accounts() {
            return Ok(accounts);
        }

        let mut accounts: Vec<AccountSnapshot> =
            self.run_worker(WorkerCommand::GetAccounts, &[]).await?;
        for account in &mut accounts {
            account.broker_name = self.name.clone();
        }
        info!("[{}] {} account(s)", self.name, accounts.len());
        self.set_cached_accounts(Some(accounts.clone()));
        Ok(accounts)
    }

    async fn get_balance(&self, account_number: &str) -> Result<BalanceSnapshot> {
        self.ensure_connected().await?;
        let mut balance: BalanceSnapshot = self
            .run_worker(WorkerCommand::GetBalance, &[account_number])
            .await?;
        if balance.account_number.is_empty() {
            balance.account_number = account_number.to_string();
        }
        Ok(balance)
    }

    async fn get_holdings(&self, account_number: &str) -> Result<Vec<HoldingSnapshot>> {
        self.ensure_connected().await?;
        let mut holdings: Vec<HoldingSnapshot> = self
            .run_worker(WorkerCommand::GetHoldings, &[account_number])
            .await?;
        for holding in &mut holdings {
            if holding.account_number.is_empty() {
                holding.account_number = account_number.to_string();
            }
        }
        info!(
            "[{}] {} holding(s) fetched for {}",
            self.name,
            holdings.len(),
            account_number
        );
        Ok(holdings)
    }

    async fn get_transactions(
        &self,
        account_number: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<TransactionRecord>> {
        warn!(
            "[{}] The worker has no execution history command; no transactions for {} ({} to {})",
            self.name, account_number, start_date, end_date
        );
        Ok(Vec::new())
    }
}

/// Paths with a directory part are checked as given; bare names are searched
/// in each `search_path` entry.
pub(super) fn resolve_program(program: &Path, search_path: Option<&std::ffi::OsStr>) -> Option<PathBuf> {
    if program.is_absolute() || program.components().count() > 1 {
        return program.is_file().then(|| program.to_path_buf());
    }

    let file_name = program.as_os_str();
    std::env::split_paths(search_path?)
        .flat_map(|dir| {
            let mut with_suffix = file_name.to_os_string();
            with_suffix.push(std::env::consts::EXE_SUFFIX);
            [dir.join(file_name), dir.join(with_suffix)]
        })
        .find(|candidate| candidate.is_file())
}

fn diagnostic(stdout: &str, stderr: &str) -> String {
    let clip = |s: &str| s.trim().chars().take(500).collect::<String>();
    format!("stdout={:?} stderr={:?}", clip(stdout), clip(stderr))
}
