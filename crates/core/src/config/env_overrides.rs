use std::path::PathBuf;

use log::debug;

use super::AppConfig;
use crate::brokers::ApiKind;

/// Environment variables that may patch the configuration document.
///
/// Each supported variable is a named field. Broker-level values apply to the
/// first broker entry of the matching kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    pub kis_app_key: Option<String>,
    pub kis_app_secret: Option<String>,
    pub kis_base_url: Option<String>,
    pub kis_tr_id_balance: Option<String>,
    pub kis_account_product_code: Option<String>,
    pub kis_account_prefix: Option<String>,
    pub kis_account_product: Option<String>,
    pub kis_api_balance: Option<String>,
    pub kiwoom_worker_path: Option<PathBuf>,
    pub database_path: Option<PathBuf>,
    pub token_dir: Option<PathBuf>,
}

impl EnvOverrides {
    /// Reads the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds overrides from an arbitrary lookup. Blank values are ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            kis_app_key: get("KIS_APP_KEY"),
            kis_app_secret: get("KIS_APP_SECRET"),
            kis_base_url: get("KIS_BASE_URL"),
            kis_tr_id_balance: get("KIS_TR_ID_BALANCE"),
            kis_account_product_code: get("KIS_ACCOUNT_PRODUCT_CODE"),
            kis_account_prefix: get("KIS_ACCOUNT_8_PROD"),
            kis_account_product: get("KIS_ACCOUNT_PD_PROD"),
            kis_api_balance: get("KIS_API_BALANCE"),
            kiwoom_worker_path: get("KIWOOM_WORKER_PATH").map(PathBuf::from),
            database_path: get("DATABASE_PATH").map(PathBuf::from),
            token_dir: get("TOKEN_DIR").map(PathBuf::from),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Patches `config` in place.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(path) = &self.database_path {
            config.database.path = path.clone();
        }
        if let Some(dir) = &self.token_dir {
            config.token_dir = dir.clone();
        }

        if let Some(broker) = config.first_of_kind_mut(ApiKind::Http) {
            let credentials = &mut broker.credentials;
            set_opt(&mut credentials.app_key, &self.kis_app_key);
            set_opt(&mut credentials.app_secret, &self.kis_app_secret);

            let settings = &mut broker.api_settings;
            set(&mut settings.base_url, &self.kis_base_url);
            set(&mut settings.tr_id_balance, &self.kis_tr_id_balance);
            set(
                &mut settings.account_product_code,
                &self.kis_account_product_code,
            );
            set_opt(&mut settings.account_prefix, &self.kis_account_prefix);
            set_opt(&mut settings.account_product, &self.kis_account_product);
            set(&mut settings.api_balance, &self.kis_api_balance);
            debug!(
                "Applied environment overrides to broker '{}' (app key {})",
                broker.name,
                broker.credentials.masked_key()
            );
        }

        if let Some(path) = &self.kiwoom_worker_path {
            if let Some(broker) = config.first_of_kind_mut(ApiKind::Subprocess) {
                broker.api_settings.worker_path = Some(path.clone());
            }
        }
    }
}

fn set(target: &mut String, value: &Option<String>) {
    if let Some(v) = value {
        *target = v.clone();
    }
}

fn set_opt(target: &mut Option<String>, value: &Option<String>) {
    if value.is_some() {
        *target = value.clone();
    }
}
