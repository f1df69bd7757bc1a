use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal_macros::dec;
use serde_json::json;
use tempfile::{tempdir, TempDir};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;
use crate::broker::BrokerClient;
use crate::token_store::TokenStore;
use stockfolio_core::brokers::ApiKind;
use stockfolio_core::config::{ApiSettings, BrokerConfig, Credentials, RateLimit};
use stockfolio_core::errors::{BrokerError, Error};

const BALANCE_PATH: &str = "/uapi/domestic-stock/v1/trading/inquire-balance";

fn broker_config(base_url: &str) -> BrokerConfig {
    BrokerConfig {
        name: "kis".to_string(),
        api_type: ApiKind::Http,
        enabled: true,
        credentials: Credentials::new("PSkey1234567890", "app-secret"),
        api_settings: ApiSettings {
            base_url: base_url.to_string(),
            account_prefix: Some("50123456".to_string()),
            account_product: Some("01".to_string()),
            ..ApiSettings::default()
        },
    }
}

fn token_store_with_token(token: Option<&str>) -> (TokenStore, TempDir) {
    let dir = tempdir().unwrap();
    let store = TokenStore::open(dir.path(), "kis").unwrap();
    if let Some(token) = token {
        store.save(token, None, 86_400).unwrap();
    }
    (store, dir)
}

fn inquiry_payload() -> serde_json::Value {
    json!({
        "rt_cd": "0",
        "msg_cd": "20310000",
        "msg1": "모의투자 조회가 완료되었습니다.",
        "output1": [
            {"pdno": "005930", "prdt_name": "삼성전자", "hldg_qty": "10",
             "pchs_avg_pric": "71000.0000", "prpr": "78000", "evlu_amt": "780000",
             "evlu_pfls_amt": "70000", "evlu_pfls_rt": "9.86"},
            {"pdno": "035720", "prdt_name": "카카오", "hldg_qty": "4",
             "pchs_avg_pric": "52000", "prpr": "48000", "evlu_amt": "192000",
             "evlu_pfls_amt": "-16000", "evlu_pfls_rt": "-7.69"}
        ],
        "output2": [{
            "dnca_tot_amt": "1028000",
            "tot_asst_amt": "2000000",
            "evlu_amt": "972000",
            "evlu_pfls_amt": "54000",
            "evlu_pfls_rt": "2.78"
        }]
    })
}

// ── wiremock-backed tests ────────────────────────────────────────────────────

#[tokio::test]
async fn test_connect_exchanges_credentials_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/tokenP"))
        .and(body_partial_json(json!({
            "grant_type": "client_credentials",
            "appkey": "PSkey1234567890",
            "appsecret": "app-secret"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok-1",
            "token_type": "Bearer",
            "expires_in": 86400
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (store, _dir) = token_store_with_token(None);
    let config = broker_config(&server.uri());

    let client = HttpBrokerClient::from_config(&config, store.clone()).unwrap();
    assert!(client.connect().await.unwrap());
    assert!(client.is_connected());
    assert_eq!(store.get_access_token().as_deref(), Some("tok-1"));

    // A second client over the same scope reuses the stored token.
    let again = HttpBrokerClient::from_config(&config, store).unwrap();
    assert!(again.connect().await.unwrap());
}

#[tokio::test]
async fn test_balance_and_holdings_are_parsed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(BALANCE_PATH))
        .and(header("authorization", "Bearer cached-token"))
        .and(header("tr_id", "TTTC8434R"))
        .and(header("custtype", "P"))
        .and(query_param("CANO", "50123456"))
        .and(query_param("ACNT_PRDT_CD", "01"))
        .and(query_param("INQR_DVSN", "01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(inquiry_payload()))
        .mount(&server)
        .await;

    let (store, _dir) = token_store_with_token(Some("cached-token"));
    let client = HttpBrokerClient::from_config(&broker_config(&server.uri()), store).unwrap();

    let balance = client.get_balance("5012345601").await.unwrap();
    assert_eq!(balance.account_number, "5012345601");
    assert_eq!(balance.cash_balance, dec!(1028000));
    assert_eq!(balance.total_balance, dec!(2000000));
    assert_eq!(balance.stock_balance, dec!(972000));
    assert_eq!(balance.profit_loss_rate, dec!(2.78));

    let holdings = client.get_holdings("5012345601").await.unwrap();
    assert_eq!(holdings.len(), 2);
    assert_eq!(holdings[1].symbol, "035720");
    assert_eq!(holdings[1].profit_loss, dec!(-16000));

    let quote = client.get_stock_price("005930").await.unwrap();
    assert_eq!(quote.change_price, dec!(7000));
    assert_eq!(quote.quantity, 10);
    assert!(client.get_stock_price("000000").await.is_err());
}

#[tokio::test]
async fn test_vendor_rejection_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(BALANCE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rt_cd": "1",
            "msg_cd": "OPSQ2000",
            "msg1": "ERROR : INPUT INVALID_CHECK_ACNO"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (store, _dir) = token_store_with_token(Some("cached-token"));
    let client = HttpBrokerClient::from_config(&broker_config(&server.uri()), store).unwrap();

    let err = client.get_balance("5012345601").await.unwrap_err();
    assert!(matches!(err, Error::Broker(BrokerError::Vendor(msg)) if msg.contains("INVALID_CHECK_ACNO")));
}

#[tokio::test]
async fn test_rejected_token_exchange_is_authentication_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/tokenP"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error_description": "유효하지 않은 AppKey입니다.",
            "error_code": "EGW00103"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (store, _dir) = token_store_with_token(None);
    let client =
        HttpBrokerClient::from_config(&broker_config(&server.uri()), store.clone()).unwrap();

    let err = client.connect().await.unwrap_err();
    assert!(err.is_authentication());
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert!(store.get_token().is_none());
}

#[tokio::test]
async fn test_missing_credentials_fail_before_any_request() {
    let server = MockServer::start().await;
    let mut config = broker_config(&server.uri());
    config.credentials = Credentials::default();

    let (store, _dir) = token_store_with_token(None);
    let client = HttpBrokerClient::from_config(&config, store).unwrap();

    assert!(client.connect().await.unwrap_err().is_authentication());
    assert!(client.get_accounts().await.unwrap_err().is_authentication());
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

// ── scripted transport tests (virtual time) ──────────────────────────────────

type Handler = dyn Fn(&HttpRequest, usize) -> Result<HttpResponse, BrokerError> + Send + Sync;

/// Replies through `handler(request, api_call_index)` and records every request.
struct ScriptedTransport {
    handler: Box<Handler>,
    api_calls: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
}

impl ScriptedTransport {
    fn new<F>(handler: F) -> Self
    where
        F: Fn(&HttpRequest, usize) -> Result<HttpResponse, BrokerError> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            api_calls: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, BrokerError> {
        let index = if request.url.ends_with("/oauth2/tokenP") {
            usize::MAX
        } else {
            self.api_calls.fetch_add(1, Ordering::SeqCst)
        };
        self.requests.lock().unwrap().push(request.clone());
        (self.handler)(&request, index)
    }
}

fn ok_json(value: serde_json::Value) -> Result<HttpResponse, BrokerError> {
    Ok(HttpResponse {
        status: 200,
        body: value.to_string(),
    })
}

#[tokio::test(start_paused = true)]
async fn test_retry_bound_against_always_failing_transport() {
    let transport =
        ScriptedTransport::new(|_, _| Err(BrokerError::Transport("connection refused".into())));
    let api_calls = Arc::clone(&transport.api_calls);

    let (store, _dir) = token_store_with_token(Some("cached-token"));
    let client =
        HttpBrokerClient::with_transport(&broker_config("http://broker.invalid"), store, transport);

    let started = tokio::time::Instant::now();
    let err = client.get_balance("5012345601").await.unwrap_err();

    assert!(matches!(err, Error::Broker(BrokerError::Transport(_))));
    assert_eq!(api_calls.load(Ordering::SeqCst), 3);
    assert!(started.elapsed() >= Duration::from_secs(1 + 2 + 4));
}

#[tokio::test(start_paused = true)]
async fn test_transient_failure_then_success() {
    let transport = ScriptedTransport::new(|_, index| match index {
        0 => Ok(HttpResponse {
            status: 503,
            body: "upstream unavailable".into(),
        }),
        _ => ok_json(inquiry_payload()),
    });
    let api_calls = Arc::clone(&transport.api_calls);

    let (store, _dir) = token_store_with_token(Some("cached-token"));
    let client =
        HttpBrokerClient::with_transport(&broker_config("http://broker.invalid"), store, transport);

    let balance = client.get_balance("5012345601").await.unwrap();
    assert_eq!(balance.cash_balance, dec!(1028000));
    assert_eq!(api_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_client_errors_are_not_retried() {
    let transport = ScriptedTransport::new(|_, _| {
        Ok(HttpResponse {
            status: 400,
            body: "bad request".into(),
        })
    });
    let api_calls = Arc::clone(&transport.api_calls);

    let (store, _dir) = token_store_with_token(Some("cached-token"));
    let client =
        HttpBrokerClient::with_transport(&broker_config("http://broker.invalid"), store, transport);

    let err = client.get_holdings("5012345601").await.unwrap_err();
    assert!(matches!(err, Error::Broker(BrokerError::Http { status: 400, .. })));
    assert_eq!(api_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_token_is_revalidated_before_each_attempt() {
    // The server rejects the cached token once; the next attempt must carry a
    // freshly exchanged one.
    let transport = ScriptedTransport::new(|request, index| {
        if index == usize::MAX {
            return ok_json(json!({"access_token": "fresh-token", "expires_in": 86400}));
        }
        let auth = request
            .headers
            .iter()
            .find(|(name, _)| name == "authorization")
            .map(|(_, value)| value.as_str());
        match auth {
            Some("Bearer fresh-token") => ok_json(inquiry_payload()),
            _ => Ok(HttpResponse {
                status: 401,
                body: "expired token".into(),
            }),
        }
    });
    let requests = Arc::clone(&transport.requests);

    let (store, _dir) = token_store_with_token(Some("stale-token"));
    let client = HttpBrokerClient::with_transport(
        &broker_config("http://broker.invalid"),
        store.clone(),
        transport,
    );

    let holdings = client.get_holdings("5012345601").await.unwrap();
    assert_eq!(holdings.len(), 2);
    assert_eq!(store.get_access_token().as_deref(), Some("fresh-token"));

    let token_exchanges = requests
        .lock()
        .unwrap()
        .iter()
        .filter(|r| r.url.ends_with("/oauth2/tokenP"))
        .count();
    assert_eq!(token_exchanges, 1);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_spaces_successful_calls() {
    let transport = ScriptedTransport::new(|_, _| ok_json(inquiry_payload()));

    let mut config = broker_config("http://broker.invalid");
    config.api_settings.rate_limit = Some(RateLimit {
        requests_per_second: Some(2.0),
    });
    let (store, _dir) = token_store_with_token(Some("cached-token"));
    let client = HttpBrokerClient::with_transport(&config, store, transport);

    let started = tokio::time::Instant::now();
    client.get_balance("5012345601").await.unwrap();
    client.get_holdings("5012345601").await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(1000));
}

#[tokio::test(start_paused = true)]
async fn test_accounts_come_from_configured_split() {
    let transport = ScriptedTransport::new(|_, _| ok_json(inquiry_payload()));
    let (store, _dir) = token_store_with_token(Some("cached-token"));

    let client = HttpBrokerClient::with_transport(
        &broker_config("http://broker.invalid"),
        store,
        transport,
    );
    let accounts = client.get_accounts().await.unwrap();
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0].account_number, "5012345601");
    assert_eq!(accounts[0].broker_name, "kis");

    let mut config = broker_config("http://broker.invalid");
    config.api_settings.account_prefix = None;
    let (store, _dir) = token_store_with_token(Some("cached-token"));
    let client = HttpBrokerClient::with_transport(
        &config,
        store,
        ScriptedTransport::new(|_, _| ok_json(json!({}))),
    );
    assert!(client.get_accounts().await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_unconfigured_account_is_sliced_from_number() {
    let transport = ScriptedTransport::new(|_, _| ok_json(inquiry_payload()));
    let requests = Arc::clone(&transport.requests);

    let mut config = broker_config("http://broker.invalid");
    config.api_settings.account_prefix = None;
    config.api_settings.account_product = None;
    config.api_settings.account_product_code = "22".to_string();
    let (store, _dir) = token_store_with_token(Some("cached-token"));
    let client = HttpBrokerClient::with_transport(&config, store, transport);

    client.get_balance("7777888899").await.unwrap();

    let requests = requests.lock().unwrap();
    let query = &requests.last().unwrap().query;
    assert!(query.contains(&("CANO".to_string(), "77778888".to_string())));
    assert!(query.contains(&("ACNT_PRDT_CD".to_string(), "22".to_string())));
}
