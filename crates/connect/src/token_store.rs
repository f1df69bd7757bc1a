//! On-disk bearer token lifecycle, one isolated scope per broker.
//!
//! Each scope is a JSON document at `<token_dir>/<broker>/tokens.json`:
//!
//! ```json
//! {"current": {"access_token": "...", "refresh_token": null,
//!              "expires_at": "2024-05-20T09:00:00Z",
//!              "created_at": "2024-05-19T09:00:00Z", "expires_in": 86400}}
//! ```
//!
//! Saving overwrites the previous token. A missing, unreadable or corrupt
//! document reads as "no token" so the caller re-authenticates instead of
//! failing. Concurrent writers to the same scope from several processes are
//! not supported.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use stockfolio_core::errors::{Error, Result, ValidationError};

pub const TOKEN_FILE_NAME: &str = "tokens.json";

/// Seconds before expiry at which a token stops counting as valid.
pub const DEFAULT_REFRESH_THRESHOLD_SECS: i64 = 300;

/// A persisted bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub expires_in: i64,
}

impl TokenRecord {
    /// True iff `now + threshold < expires_at`.
    pub fn is_valid_at(&self, threshold_secs: i64, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(threshold_secs) < self.expires_at
    }
}

/// Expiry overview of a stored token, for administration views.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenExpiryInfo {
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_expired: bool,
    pub is_valid: bool,
    /// Negative once the token has expired.
    pub expires_in_seconds: i64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct TokenDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    current: Option<TokenRecord>,
}

/// Token persistence for a single broker identity.
#[derive(Debug, Clone)]
pub struct TokenStore {
    broker_name: String,
    path: PathBuf,
}

impl TokenStore {
    /// Opens the scope for `broker_name`, creating the directory and an empty
    /// document on first use.
    pub fn open(token_dir: &Path, broker_name: &str) -> Result<Self> {
        let path = Self::scope_path(token_dir, broker_name);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| {
                Error::Persistence(format!(
                    "cannot create token directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        }

        let store = Self {
            broker_name: broker_name.to_string(),
            path,
        };
        if !store.path.exists() {
            store.write(&TokenDocument::default())?;
            info!("Created token file {}", store.path.display());
        }
        Ok(store)
    }

    /// Location of a broker's token document.
    pub fn scope_path(token_dir: &Path, broker_name: &str) -> PathBuf {
        token_dir
            .join(broker_name.trim().to_lowercase())
            .join(TOKEN_FILE_NAME)
    }

    /// Broker scopes that have a token document under `token_dir`.
    pub fn list_scopes(token_dir: &Path) -> Result<Vec<String>> {
        let entries = match fs::read_dir(token_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut scopes: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().join(TOKEN_FILE_NAME).is_file())
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .collect();
        scopes.sort();
        Ok(scopes)
    }

    pub fn broker_name(&self) -> &str {
        &self.broker_name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get_token(&self) -> Option<TokenRecord> {
        self.read().current
    }

    pub fn get_access_token(&self) -> Option<String> {
        self.get_token().map(|t| t.access_token)
    }

    pub fn get_refresh_token(&self) -> Option<String> {
        self.get_token().and_then(|t| t.refresh_token)
    }

    pub fn is_valid(&self, threshold_secs: i64) -> bool {
        self.is_valid_at(threshold_secs, Utc::now())
    }

    /// True iff a token exists and `now + threshold < expires_at`.
    pub fn is_valid_at(&self, threshold_secs: i64, now: DateTime<Utc>) -> bool {
        self.get_token()
            .is_some_and(|t| t.is_valid_at(threshold_secs, now))
    }

    pub fn is_expired(&self, threshold_secs: i64) -> bool {
        !self.is_valid(threshold_secs)
    }

    pub fn save(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
        expires_in_secs: i64,
    ) -> Result<TokenRecord> {
        self.save_at(access_token, refresh_token, expires_in_secs, Utc::now())
    }

    /// Persists a token issued at `now`, replacing any previous one.
    pub fn save_at(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
        expires_in_secs: i64,
        now: DateTime<Utc>,
    ) -> Result<TokenRecord> {
        if expires_in_secs <= 0 {
            return Err(ValidationError::InvalidInput(format!(
                "token lifetime must be positive, got {expires_in_secs}s"
            ))
            .into());
        }

        let record = TokenRecord {
            access_token: access_token.to_string(),
            refresh_token: refresh_token.map(str::to_string),
            expires_at: now + Duration::seconds(expires_in_secs),
            created_at: now,
            expires_in: expires_in_secs,
        };
        self.write(&TokenDocument {
            current: Some(record.clone()),
        })?;

        info!(
            "Saved token for broker {} (expires {})",
            self.broker_name,
            record.expires_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        Ok(record)
    }

    pub fn expiry_info(&self) -> Option<TokenExpiryInfo> {
        self.expiry_info_at(Utc::now())
    }

    pub fn expiry_info_at(&self, now: DateTime<Utc>) -> Option<TokenExpiryInfo> {
        self.get_token().map(|t| {
            let is_valid = t.is_valid_at(DEFAULT_REFRESH_THRESHOLD_SECS, now);
            TokenExpiryInfo {
                created_at: t.created_at,
                expires_at: t.expires_at,
                is_expired: !is_valid,
                is_valid,
                expires_in_seconds: (t.expires_at - now).num_seconds(),
            }
        })
    }

    /// Removes the current token. Does nothing when there is none.
    pub fn delete(&self) -> Result<()> {
        let mut document = self.read();
        if document.current.take().is_some() {
            self.write(&document)?;
            info!("Deleted token for broker {}", self.broker_name);
        }
        Ok(())
    }

    /// Resets the scope to an empty document.
    pub fn clear_all(&self) -> Result<()> {
        self.write(&TokenDocument::default())?;
        info!("Cleared all tokens for broker {}", self.broker_name);
        Ok(())
    }

    fn read(&self) -> TokenDocument {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Token file {} unreadable: {}", self.path.display(), e);
                return TokenDocument::default();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("Token file {} is corrupt: {}", self.path.display(), e);
            TokenDocument::default()
        })
    }

    /// Writes to a sibling file, then renames it over the document.
    fn write(&self, document: &TokenDocument) -> Result<()> {
        let persist = |e: std::io::Error| {
            Error::Persistence(format!(
                "cannot write token file {}: {}",
                self.path.display(),
                e
            ))
        };

        let json = serde_json::to_string_pretty(document)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(persist)?;
        fs::rename(&tmp, &self.path).map_err(persist)?;
        debug!("Wrote token file {}", self.path.display());
        Ok(())
    }
}
