use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_TR_BALANCE: &str = "opw00018";
pub const DEFAULT_TR_HOLDINGS: &str = "OPW00004";
pub const DEFAULT_LOGIN_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Worker configuration, read once from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerSettings {
    pub account_password: String,
    pub delisted_filter: String,
    pub password_media: String,
    pub exchange_code: String,
    pub tr_balance: String,
    pub tr_holdings: String,
    pub login_timeout: Duration,
    pub request_timeout: Duration,
    /// Delay between event pumps while waiting.
    pub poll_interval: Duration,
    /// Pause after issuing a request, to stay under the vendor's rate limit.
    pub request_pacing: Duration,
    pub replay_file: Option<PathBuf>,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            account_password: String::new(),
            delisted_filter: "0".to_string(),
            password_media: "00".to_string(),
            exchange_code: "KRX".to_string(),
            tr_balance: DEFAULT_TR_BALANCE.to_string(),
            tr_holdings: DEFAULT_TR_HOLDINGS.to_string(),
            login_timeout: Duration::from_secs(DEFAULT_LOGIN_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            poll_interval: Duration::from_millis(100),
            request_pacing: Duration::from_millis(200),
            replay_file: None,
        }
    }
}

impl WorkerSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from `lookup`. Blank values and unparsable timeouts
    /// keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Self {
            account_password: get("KIWOOM_ACCOUNT_PASSWORD").unwrap_or(defaults.account_password),
            delisted_filter: get("KIWOOM_DELISTED_FILTER").unwrap_or(defaults.delisted_filter),
            password_media: get("KIWOOM_PASSWORD_MEDIA").unwrap_or(defaults.password_media),
            exchange_code: get("KIWOOM_EXCHANGE_CODE").unwrap_or(defaults.exchange_code),
            tr_balance: get("KIWOOM_TR_BALANCE").unwrap_or(defaults.tr_balance),
            tr_holdings: get("KIWOOM_TR_HOLDINGS").unwrap_or(defaults.tr_holdings),
            login_timeout: get("KIWOOM_LOGIN_TIMEOUT")
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.login_timeout),
            replay_file: get("KIWOOM_REPLAY_FILE").map(PathBuf::from),
            ..defaults
        }
    }
}
