use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::EnvOverrides;
use crate::brokers::ApiKind;
use crate::errors::{Error, Result};

/// Default location of the configuration document.
pub const DEFAULT_CONFIG_PATH: &str = "./config/config.json";
pub const DEFAULT_DATABASE_PATH: &str = "./data/stockfolio.db";
pub const DEFAULT_TOKEN_DIR: &str = "./tokens";

pub const DEFAULT_BASE_URL: &str = "https://openapi.koreainvestment.com:9443";
pub const DEFAULT_TOKEN_PATH: &str = "/oauth2/tokenP";
pub const DEFAULT_BALANCE_PATH: &str = "/uapi/domestic-stock/v1/trading/inquire-balance";
pub const DEFAULT_TR_ID_BALANCE: &str = "TTTC8434R";
pub const DEFAULT_ACCOUNT_PRODUCT_CODE: &str = "01";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_RETRY_COUNT: u32 = 3;
pub const DEFAULT_TOKEN_REFRESH_THRESHOLD_SECS: i64 = 300;
pub const DEFAULT_WORKER_TIMEOUT_SECS: u64 = 60;

/// Root configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default = "default_token_dir")]
    pub token_dir: PathBuf,
    #[serde(default)]
    pub brokers: Vec<BrokerConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

/// One broker integration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    pub name: String,
    pub api_type: ApiKind,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub credentials: Credentials,
    #[serde(default)]
    pub api_settings: ApiSettings,
}

/// App key and secret for a REST vendor.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub app_key: Option<String>,
    #[serde(default)]
    pub app_secret: Option<String>,
}

impl Credentials {
    pub fn new(app_key: impl Into<String>, app_secret: impl Into<String>) -> Self {
        Self {
            app_key: Some(app_key.into()),
            app_secret: Some(app_secret.into()),
        }
    }

    /// Both key and secret are present and non-blank.
    pub fn is_complete(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.app_key) && present(&self.app_secret)
    }

    /// App key truncated for log output.
    pub fn masked_key(&self) -> String {
        match self.app_key.as_deref() {
            Some(key) if key.chars().count() > 10 => {
                format!("{}...", key.chars().take(10).collect::<String>())
            }
            Some(key) if !key.is_empty() => format!("{key}..."),
            _ => "None".to_string(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("app_key", &self.masked_key())
            .field(
                "app_secret",
                &if self.app_secret.is_some() { "<redacted>" } else { "None" },
            )
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateLimit {
    #[serde(default)]
    pub requests_per_second: Option<f64>,
}

/// Vendor connection settings. Every field has a default so a broker entry
/// only names what it overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout: u64,
    pub retry_count: u32,
    pub rate_limit: Option<RateLimit>,
    /// Seconds before expiry at which a cached token is considered stale.
    pub token_refresh_threshold: i64,
    pub token_path: String,
    pub tr_id_balance: String,
    pub account_product_code: String,
    pub api_balance: String,
    /// First eight digits of the pre-configured account.
    #[serde(alias = "account_8_prod")]
    pub account_prefix: Option<String>,
    /// Product code of the pre-configured account.
    #[serde(alias = "account_pd_prod")]
    pub account_product: Option<String>,
    pub worker_path: Option<PathBuf>,
    /// Arguments placed before the worker command, e.g. an interpreter script.
    pub worker_args: Vec<String>,
    /// Wall-clock bound for a single worker invocation, in seconds.
    pub worker_timeout: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT_SECS,
            retry_count: DEFAULT_RETRY_COUNT,
            rate_limit: None,
            token_refresh_threshold: DEFAULT_TOKEN_REFRESH_THRESHOLD_SECS,
            token_path: DEFAULT_TOKEN_PATH.to_string(),
            tr_id_balance: DEFAULT_TR_ID_BALANCE.to_string(),
            account_product_code: DEFAULT_ACCOUNT_PRODUCT_CODE.to_string(),
            api_balance: DEFAULT_BALANCE_PATH.to_string(),
            account_prefix: None,
            account_product: None,
            worker_path: None,
            worker_args: Vec::new(),
            worker_timeout: DEFAULT_WORKER_TIMEOUT_SECS,
        }
    }
}

impl ApiSettings {
    /// The pre-configured account split, when both halves are set.
    pub fn configured_account(&self) -> Option<(&str, &str)> {
        match (self.account_prefix.as_deref(), self.account_product.as_deref()) {
            (Some(prefix), Some(product)) if !prefix.is_empty() && !product.is_empty() => {
                Some((prefix, product))
            }
            _ => None,
        }
    }

    /// Full number of the pre-configured account.
    pub fn configured_account_number(&self) -> Option<String> {
        self.configured_account()
            .map(|(prefix, product)| format!("{prefix}{product}"))
    }

    /// Minimum spacing between successful calls, if rate limited.
    pub fn rate_limit_interval(&self) -> Option<std::time::Duration> {
        self.rate_limit
            .and_then(|r| r.requests_per_second)
            .filter(|rps| *rps > 0.0)
            .and_then(|rps| std::time::Duration::try_from_secs_f64(1.0 / rps).ok())
    }
}

impl AppConfig {
    /// Reads and validates a configuration file, applying `overrides`.
    pub fn load(path: &Path, overrides: &EnvOverrides) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigIO(format!("cannot read {}: {}", path.display(), e))
        })?;
        let mut config = Self::from_json_str(&raw)?;
        overrides.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| Error::ConfigIO(format!("invalid configuration JSON: {e}")))
    }

    pub fn enabled_brokers(&self) -> impl Iterator<Item = &BrokerConfig> {
        self.brokers.iter().filter(|b| b.enabled)
    }

    pub fn broker(&self, name: &str) -> Option<&BrokerConfig> {
        self.brokers.iter().find(|b| b.name == name)
    }

    /// First broker entry of the given kind, enabled or not.
    pub fn first_of_kind_mut(&mut self, kind: ApiKind) -> Option<&mut BrokerConfig> {
        self.brokers.iter_mut().find(|b| b.api_type == kind)
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(Error::MissingConfigKey("database.path".to_string()));
        }
        if self.token_dir.as_os_str().is_empty() {
            return Err(Error::MissingConfigKey("token_dir".to_string()));
        }

        let mut seen = HashSet::new();
        for broker in &self.brokers {
            let name = broker.name.trim();
            if name.is_empty() {
                return Err(Error::MissingConfigKey("brokers[].name".to_string()));
            }
            if !seen.insert(name.to_lowercase()) {
                return Err(Error::InvalidConfigValue(format!(
                    "duplicate broker name '{name}'"
                )));
            }
            broker.validate()?;
        }
        Ok(())
    }
}

impl BrokerConfig {
    pub fn validate(&self) -> Result<()> {
        let settings = &self.api_settings;
        let field = |key: &str| format!("brokers[{}].api_settings.{}", self.name, key);

        if settings.timeout == 0 {
            return Err(Error::InvalidConfigValue(format!(
                "{} must be positive",
                field("timeout")
            )));
        }
        if settings.retry_count == 0 {
            return Err(Error::InvalidConfigValue(format!(
                "{} must be at least 1",
                field("retry_count")
            )));
        }
        if settings.token_refresh_threshold < 0 {
            return Err(Error::InvalidConfigValue(format!(
                "{} must not be negative",
                field("token_refresh_threshold")
            )));
        }
        if let Some(rps) = settings.rate_limit.and_then(|r| r.requests_per_second) {
            if !(rps.is_finite() && rps > 0.0) {
                return Err(Error::InvalidConfigValue(format!(
                    "{} must be a positive number",
                    field("rate_limit.requests_per_second")
                )));
            }
            if std::time::Duration::try_from_secs_f64(1.0 / rps).is_err() {
                return Err(Error::InvalidConfigValue(format!(
                    "{} is too small to pace requests",
                    field("rate_limit.requests_per_second")
                )));
            }
        }

        match self.api_type {
            ApiKind::Http => {
                if settings.base_url.trim().is_empty() {
                    return Err(Error::MissingConfigKey(field("base_url")));
                }
            }
            ApiKind::Subprocess => {
                if !self.enabled {
                    return Ok(());
                }
                if settings.worker_path.is_none() {
                    return Err(Error::MissingConfigKey(field("worker_path")));
                }
                if settings.worker_timeout == 0 {
                    return Err(Error::InvalidConfigValue(format!(
                        "{} must be positive",
                        field("worker_timeout")
                    )));
                }
            }
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_database_path() -> PathBuf {
    PathBuf::from(DEFAULT_DATABASE_PATH)
}

fn default_token_dir() -> PathBuf {
    PathBuf::from(DEFAULT_TOKEN_DIR)
}
