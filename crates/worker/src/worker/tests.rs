use std::collections::HashMap;
use std::time::Duration;

use rust_decimal_macros::dec;
use serde_json::json;

use super::*;
use crate::replay::{ReplayLogin, ReplayScript, ReplaySession};

fn fast_settings() -> WorkerSettings {
    WorkerSettings {
        account_password: "0000".to_string(),
        login_timeout: Duration::from_millis(50),
        request_timeout: Duration::from_millis(50),
        poll_interval: Duration::from_millis(1),
        request_pacing: Duration::ZERO,
        ..WorkerSettings::default()
    }
}

fn row(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn script() -> ReplayScript {
    let balance = HashMap::from([(
        "예수금상세현황요청".to_string(),
        vec![row(&[
            ("예수금", "000000500,000"),
            ("총평가금액", "000001200000"),
            ("총자산", "000001750000"),
            ("총손익금액", "-000000030000"),
            ("총수익률(%)", "-2.44"),
        ])],
    )]);
    let holdings = HashMap::from([(
        "계좌평가현황".to_string(),
        vec![
            row(&[
                ("종목코드", "A005930 "),
                ("종목명", " 삼성전자"),
                ("보유수량", "000000000012"),
                ("매입가", "000000065000"),
                ("현재가", "+71000"),
                ("평가금액", "000000852000"),
                ("평가손익", "000000072000"),
                ("손익율", "92307"),
            ]),
            row(&[("종목코드", "  "), ("종목명", "empty row")]),
            row(&[
                ("종목코드", "A035720"),
                ("종목명", "카카오"),
                ("보유수량", "3"),
                ("현재가", "not-a-number"),
            ]),
        ],
    )]);

    ReplayScript {
        login: Some(ReplayLogin {
            err_code: 0,
            info: HashMap::from([("ACCNO".to_string(), "8011223311;8011223312;".to_string())]),
        }),
        tr: HashMap::from([
            ("opw00018".to_string(), balance),
            ("OPW00004".to_string(), holdings),
        ]),
    }
}

fn args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|p| p.to_string()).collect()
}

fn run_with(script: ReplayScript, parts: &[&str]) -> (WorkerResponse<Value>, i32) {
    run(&args(parts), fast_settings(), |_| Ok(ReplaySession::new(script)))
}

#[test]
fn test_accounts_from_login_info() {
    let (response, code) = run_with(script(), &["get_accounts"]);

    assert_eq!(code, 0);
    assert!(response.success);
    let accounts = response.data.unwrap();
    assert_eq!(accounts.as_array().unwrap().len(), 2);
    assert_eq!(accounts[1]["account_number"], json!("8011223312"));
    assert_eq!(accounts[0]["account_type"], json!("general"));
}

#[test]
fn test_balance_uses_vendor_reported_stock_value() {
    let mut worker = Worker::new(ReplaySession::new(script()), fast_settings());
    worker.login().unwrap();

    let balance = worker.get_balance("8011223311").unwrap();
    assert_eq!(balance.account_number, "8011223311");
    assert_eq!(balance.cash_balance, dec!(500000));
    assert_eq!(balance.stock_balance, dec!(1200000));
    assert_eq!(balance.evaluation_amount, dec!(1200000));
    assert_eq!(balance.total_balance, dec!(1750000));
    assert_eq!(balance.profit_loss, dec!(-30000));
    assert_eq!(balance.profit_loss_rate, dec!(-2.44));

    let (name, inputs) = &worker.session().requests[0];
    assert_eq!(name, "balance_8011223311");
    assert!(inputs.contains(&("비밀번호".to_string(), "0000".to_string())));
    assert!(inputs.contains(&("조회구분".to_string(), "1".to_string())));
}

#[test]
fn test_holdings_drop_blank_symbols_and_scale_rate() {
    let mut worker = Worker::new(ReplaySession::new(script()), fast_settings());
    worker.login().unwrap();

    let holdings = worker.get_holdings("8011223311").unwrap();
    assert_eq!(holdings.len(), 2);

    let samsung = &holdings[0];
    assert_eq!(samsung.symbol, "A005930");
    assert_eq!(samsung.name, "삼성전자");
    assert_eq!(samsung.account_number, "8011223311");
    assert_eq!(samsung.quantity, 12);
    assert_eq!(samsung.current_price, dec!(71000));
    assert_eq!(samsung.profit_loss_rate, dec!(9.2307));

    // Unreadable numbers default to zero without dropping the row.
    assert_eq!(holdings[1].current_price, dec!(0));
    assert_eq!(holdings[1].quantity, 3);

    let (_, inputs) = &worker.session().requests[0];
    assert!(inputs.contains(&("거래소구분".to_string(), "KRX".to_string())));
    assert!(inputs.contains(&("상장폐지조회구분".to_string(), "0".to_string())));
}

#[test]
fn test_login_timeout_reports_failure() {
    let mut silent = script();
    silent.login = None;

    let (response, code) = run_with(silent, &["get_accounts"]);
    assert_eq!(code, 1);
    assert!(!response.success);
    assert!(response.error.unwrap().contains("Login timeout"));
}

#[test]
fn test_rejected_login() {
    let mut rejected = script();
    rejected.login = Some(ReplayLogin {
        err_code: -101,
        info: HashMap::new(),
    });

    let mut worker = Worker::new(ReplaySession::new(rejected), fast_settings());
    assert_eq!(worker.login(), Err(WorkerError::LoginRejected(-101)));
}

#[test]
fn test_argument_errors_skip_the_session() {
    let never = |_: &WorkerSettings| -> Result<ReplaySession> {
        panic!("session must not be opened for invalid arguments")
    };

    let (response, code) = run(&args(&["get_balance"]), fast_settings(), never);
    assert_eq!(code, 1);
    assert!(response.error.unwrap().contains("account number is required"));

    let (response, code) = run(&args(&["place_order", "8011223311"]), fast_settings(), never);
    assert_eq!(code, 1);
    assert_eq!(response.error.as_deref(), Some("Unknown command: place_order"));

    let (response, code) = run(&[], fast_settings(), never);
    assert_eq!(code, 1);
    assert!(response.data.is_none());
}

#[test]
fn test_unknown_tr_fails_request() {
    let mut settings = fast_settings();
    settings.tr_balance = "opw99999".to_string();

    let mut worker = Worker::new(ReplaySession::new(script()), settings);
    worker.login().unwrap();
    assert!(matches!(
        worker.get_balance("8011223311"),
        Err(WorkerError::RequestFailed { code: -300, .. })
    ));
}

/// Accepts requests but never delivers their data.
struct DroppingSession(ReplaySession);

impl VendorSession for DroppingSession {
    fn comm_connect(&mut self) -> i32 {
        self.0.comm_connect()
    }
    fn login_info(&self, tag: &str) -> String {
        self.0.login_info(tag)
    }
    fn set_input_value(&mut self, key: &str, value: &str) {
        self.0.set_input_value(key, value)
    }
    fn comm_rq_data(&mut self, name: &str, tr: &str, prev_next: i32, screen: &str) -> i32 {
        self.0.comm_rq_data(name, tr, prev_next, screen)
    }
    fn get_comm_data(&self, tr: &str, record: &str, index: usize, item: &str) -> String {
        self.0.get_comm_data(tr, record, index, item)
    }
    fn repeat_count(&self, tr: &str, record: &str) -> usize {
        self.0.repeat_count(tr, record)
    }
    fn process_events(&mut self) -> Vec<SessionEvent> {
        self.0
            .process_events()
            .into_iter()
            .filter(|e| matches!(e, SessionEvent::Connected { .. }))
            .collect()
    }
    fn comm_terminate(&mut self) {
        self.0.comm_terminate()
    }
}

#[test]
fn test_request_timeout_and_session_terminated() {
    let (response, code) = run(
        &args(&["get_holdings", "8011223311"]),
        fast_settings(),
        |_| Ok(DroppingSession(ReplaySession::new(script()))),
    );
    assert_eq!(code, 1);
    assert_eq!(
        response.error.as_deref(),
        Some("Request timeout: holdings_8011223311")
    );

    let mut worker = Worker::new(ReplaySession::new(script()), fast_settings());
    worker
        .execute(WorkerCommand::GetAccounts, None)
        .unwrap();
    assert!(worker.session().terminated);
}
