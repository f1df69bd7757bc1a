//! REST broker client with bearer-token lifecycle, retry and rate limiting.

use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use log::{debug, error, info, warn};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use super::mapping::{check_vendor_status, parse_balance, parse_holdings};
use super::transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
use crate::broker::BrokerClient;
use crate::token_store::TokenStore;
use stockfolio_core::accounts::AccountSnapshot;
use stockfolio_core::balances::BalanceSnapshot;
use stockfolio_core::brokers::ApiKind;
use stockfolio_core::config::{ApiSettings, BrokerConfig, Credentials};
use stockfolio_core::errors::{BrokerError, Error, Result};
use stockfolio_core::holdings::{HoldingSnapshot, StockQuote};
use stockfolio_core::transactions::TransactionRecord;

/// Lifetime assumed when the token response omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 86_400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Authenticating,
    Connected,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// [`BrokerClient`] for a REST API authenticated with client-credential
/// bearer tokens.
pub struct HttpBrokerClient<T: Transport = ReqwestTransport> {
    name: String,
    credentials: Credentials,
    settings: ApiSettings,
    token_store: TokenStore,
    transport: T,
    state: RwLock<ConnectionState>,
    access_token: RwLock<Option<String>>,
    // Serializes token exchanges so concurrent calls authenticate once.
    auth_lock: Mutex<()>,
}

impl HttpBrokerClient<ReqwestTransport> {
    pub fn from_config(config: &BrokerConfig, token_store: TokenStore) -> Result<Self> {
        let transport = ReqwestTransport::new()?;
        Ok(Self::with_transport(config, token_store, transport))
    }
}

impl<T: Transport> HttpBrokerClient<T> {
    pub fn with_transport(config: &BrokerConfig, token_store: TokenStore, transport: T) -> Self {
        debug!(
            "[{}] base_url={} app_key={}",
            config.name,
            config.api_settings.base_url,
            config.credentials.masked_key()
        );
        Self {
            name: config.name.clone(),
            credentials: config.credentials.clone(),
            settings: config.api_settings.clone(),
            token_store,
            transport,
            state: RwLock::new(ConnectionState::Disconnected),
            access_token: RwLock::new(None),
            auth_lock: Mutex::new(()),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.write().unwrap_or_else(|e| e.into_inner()) = state;
    }

    fn cached_token(&self) -> Option<String> {
        self.access_token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn set_cached_token(&self, token: Option<String>) {
        *self.access_token.write().unwrap_or_else(|e| e.into_inner()) = token;
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.settings.timeout)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.settings.base_url.trim_end_matches('/'), path)
    }

    /// Returns a token that stays valid past the refresh threshold,
    /// exchanging credentials when the stored one is missing or stale.
    async fn ensure_token(&self) -> Result<String> {
        let threshold = self.settings.token_refresh_threshold;
        if self.token_store.is_valid(threshold) {
            if let Some(token) = self.cached_token() {
                return Ok(token);
            }
        }

        let _guard = self.auth_lock.lock().await;
        // Another task may have refreshed while we waited.
        if self.token_store.is_valid(threshold) {
            if let Some(token) = self.token_store.get_access_token() {
                debug!("[{}] Using stored token", self.name);
                self.set_cached_token(Some(token.clone()));
                return Ok(token);
            }
        }

        info!("[{}] Token missing or near expiry, requesting a new one", self.name);
        self.request_access_token().await
    }

    /// Client-credentials exchange. Never retried.
    async fn request_access_token(&self) -> Result<String> {
        let (Some(app_key), Some(app_secret)) = (
            self.credentials.app_key.as_deref(),
            self.credentials.app_secret.as_deref(),
        ) else {
            return Err(Error::Authentication(
                "app key or app secret is not configured".to_string(),
            ));
        };

        let request = HttpRequest::post_json(
            self.url(&self.settings.token_path),
            json!({
                "grant_type": "client_credentials",
                "appkey": app_key,
                "appsecret": app_secret,
            }),
            self.timeout(),
        );

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| Error::Authentication(format!("token request failed: {e}")))?;

        if !response.is_success() {
            return Err(Error::Authentication(format!(
                "token request rejected with HTTP {}: {}",
                response.status,
                truncate(&response.body)
            )));
        }

        let parsed: TokenResponse = serde_json::from_str(&response.body).map_err(|e| {
            Error::Authentication(format!("token response is not valid JSON: {e}"))
        })?;
        let access_token = parsed
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                Error::Authentication("token response has no access_token".to_string())
            })?;
        let expires_in = parsed
            .expires_in
            .filter(|s| *s > 0)
            .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);

        self.token_store
            .save(&access_token, parsed.refresh_token.as_deref(), expires_in)?;
        self.set_cached_token(Some(access_token.clone()));
        info!("[{}] Access token issued and stored", self.name);
        Ok(access_token)
    }

    async fn ensure_connected(&self) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }
        self.connect().await.map(|_| ())
    }

    /// Sends an authenticated request built by `build`, retrying
    /// transport-level failures with exponential backoff.
    ///
    /// The token is re-validated before every attempt. Vendor rejections,
    /// malformed payloads and non-retryable statuses fail immediately.
    async fn send_with_retry<F>(&self, build: F) -> Result<Value>
    where
        F: Fn() -> HttpRequest + Send + Sync,
    {
        let attempts = self.settings.retry_count.max(1);
        let mut last_error = BrokerError::Transport("no attempt made".to_string());

        for attempt in 0..attempts {
            let token = self.ensure_token().await?;
            let request = build()
                .header("authorization", format!("Bearer {token}"))
                .header("appkey", self.credentials.app_key.clone().unwrap_or_default())
                .header(
                    "appsecret",
                    self.credentials.app_secret.clone().unwrap_or_default(),
                );

            let failure = match self.transport.send(request).await {
                Ok(response) if response.is_success() => {
                    let payload = decode_payload(&response)?;
                    check_vendor_status(&payload)?;
                    if let Some(interval) = self.settings.rate_limit_interval() {
                        tokio::time::sleep(interval).await;
                    }
                    return Ok(payload);
                }
                Ok(response) if response.status == 401 => {
                    // The server no longer honours the token; force a new exchange.
                    warn!("[{}] Token rejected by server, discarding it", self.name);
                    self.token_store.delete()?;
                    self.set_cached_token(None);
                    BrokerError::Http {
                        status: response.status,
                        body: truncate(&response.body),
                    }
                }
                Ok(response) => {
                    let err = BrokerError::Http {
                        status: response.status,
                        body: truncate(&response.body),
                    };
                    if !err.is_transient() {
                        return Err(err.into());
                    }
                    err
                }
                Err(err) if err.is_transient() => err,
                Err(err) => return Err(err.into()),
            };

            let backoff = Duration::from_secs(1u64 << attempt.min(16));
            warn!(
                "[{}] Attempt {}/{} failed: {}. Backing off {}s",
                self.name,
                attempt + 1,
                attempts,
                failure,
                backoff.as_secs()
            );
            last_error = failure;
            tokio::time::sleep(backoff).await;
        }

        error!("[{}] Giving up after {} attempts", self.name, attempts);
        Err(last_error.into())
    }

    /// Account prefix and product code for the inquiry. A pre-configured
    /// split wins over slicing the account number.
    fn account_parts(&self, account_number: &str) -> (String, String) {
        match self.settings.configured_account() {
            Some((prefix, product)) => (prefix.to_string(), product.to_string()),
            None => (
                account_number.chars().take(8).collect(),
                self.settings.account_product_code.clone(),
            ),
        }
    }

    fn inquiry_request(&self, account_number: &str) -> HttpRequest {
        let (cano, product) = self.account_parts(account_number);
        HttpRequest::get(self.url(&self.settings.api_balance), self.timeout())
            .header("tr_id", self.settings.tr_id_balance.clone())
            .header("custtype", "P")
            .query_pairs([
                ("CANO", cano),
                ("ACNT_PRDT_CD", product),
                ("AFHR_FLPR_YN", "N".to_string()),
                ("OFL_YN", "N".to_string()),
                ("INQR_DVSN", "01".to_string()),
                ("UNPR_DVSN", "01".to_string()),
                ("FUND_STTL_ICLD_YN", "N".to_string()),
                ("FNCG_AMT_AUTO_RDPT_YN", "N".to_string()),
                ("PRCS_DVSN", "01".to_string()),
                ("CTX_AREA_FK100", String::new()),
                ("CTX_AREA_NK100", String::new()),
            ])
    }

    async fn inquire(&self, account_number: &str) -> Result<Value> {
        self.ensure_connected().await?;
        self.send_with_retry(|| self.inquiry_request(account_number))
            .await
    }

    /// Quote for a held symbol of the pre-configured account.
    pub async fn get_stock_price(&self, symbol: &str) -> Result<StockQuote> {
        let account = self.settings.configured_account_number().ok_or_else(|| {
            BrokerError::Unsupported("quotes need a pre-configured account".to_string())
        })?;

        let holdings = self.get_holdings(&account).await?;
        holdings
            .iter()
            .find(|h| h.symbol == symbol)
            .map(StockQuote::from)
            .ok_or_else(|| {
                BrokerError::Unsupported(format!(
                    "{symbol} is not held; quotes are only available for held symbols"
                ))
                .into()
            })
    }
}

#[async_trait]
impl<T: Transport> BrokerClient for HttpBrokerClient<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn api_kind(&self) -> ApiKind {
        ApiKind::Http
    }

    async fn connect(&self) -> Result<bool> {
        info!("[{}] Connecting", self.name);
        if !self.credentials.is_complete() {
            self.set_state(ConnectionState::Disconnected);
            return Err(Error::Authentication(
                "app key or app secret is not configured".to_string(),
            ));
        }

        self.set_state(ConnectionState::Authenticating);
        match self.ensure_token().await {
            Ok(_) => {
                self.set_state(ConnectionState::Connected);
                info!("[{}] Connected", self.name);
                Ok(true)
            }
            Err(e) => {
                self.set_state(ConnectionState::Disconnected);
                error!("[{}] Connection failed: {}", self.name, e);
                Err(e)
            }
        }
    }

    async fn disconnect(&self) -> Result<bool> {
        self.set_state(ConnectionState::Disconnected);
        self.set_cached_token(None);
        info!("[{}] Disconnected", self.name);
        Ok(true)
    }

    fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    async fn get_accounts(&self) -> Result<Vec<AccountSnapshot>> {
        self.ensure_connected().await?;

        let accounts = match self.settings.configured_account_number() {
            Some(number) => vec![AccountSnapshot::new(
                number,
                format!("{} account", self.name),
                "general",
                self.name.clone(),
            )],
            None => {
                warn!(
                    "[{}] No account configured (account_prefix/account_product)",
                    self.name
                );
                Vec::new()
            }
        };
        info!("[{}] {} account(s)", self.name, accounts.len());
        Ok(accounts)
    }

    async fn get_balance(&self, account_number: &str) -> Result<BalanceSnapshot> {
        let payload = self.inquire(account_number).await?;
        let balance = parse_balance(account_number, &payload);
        info!("[{}] Balance fetched for {}", self.name, account_number);
        Ok(balance)
    }

    async fn get_holdings(&self, account_number: &str) -> Result<Vec<HoldingSnapshot>> {
        let payload = self.inquire(account_number).await?;
        let holdings = parse_holdings(account_number, &payload);
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
        self.inquire(account_number).await?;
        info!(
            "[{}] Execution history is not exposed by this API; no transactions for {} ({} to {})",
            self.name, account_number, start_date, end_date
        );
        Ok(Vec::new())
    }
}

fn decode_payload(response: &HttpResponse) -> std::result::Result<Value, BrokerError> {
    serde_json::from_str(&response.body).map_err(|e| {
        BrokerError::MalformedResponse(format!("{e}: {}", truncate(&response.body)))
    })
}

fn truncate(body: &str) -> String {
    body.chars().take(200).collect()
}
