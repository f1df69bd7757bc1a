//! Vendor handshake, request/response pumping and result parsing.

use std::collections::{HashMap, VecDeque};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use rust_decimal::Decimal;
use serde_json::Value;

use stockfolio_core::accounts::AccountSnapshot;
use stockfolio_core::balances::BalanceSnapshot;
use stockfolio_core::brokers::{WorkerCommand, WorkerResponse};
use stockfolio_core::holdings::HoldingSnapshot;
use stockfolio_core::utils::numeric::{parse_decimal_or_zero, parse_i64_or_zero};

use crate::errors::{Result, WorkerError};
use crate::session::{SessionEvent, VendorSession};
use crate::settings::WorkerSettings;

const BALANCE_RECORD: &str = "예수금상세현황요청";
const HOLDINGS_RECORD: &str = "계좌평가현황";
const SCREEN_NO: &str = "0101";
const BROKER_LABEL: &str = "Kiwoom";

/// Parsed payload of one TR response.
#[derive(Debug, Clone, PartialEq)]
enum TrData {
    Balance(BalanceSnapshot),
    Holdings(Vec<HoldingSnapshot>),
}

/// Drives a [`VendorSession`] for a single command.
pub struct Worker<S: VendorSession> {
    session: S,
    settings: WorkerSettings,
    connected: bool,
    accounts: Vec<String>,
    // One queue per in-flight request name; results land here from the pump.
    pending: HashMap<String, VecDeque<TrData>>,
}

impl<S: VendorSession> Worker<S> {
    pub fn new(session: S, settings: WorkerSettings) -> Self {
        Self {
            session,
            settings,
            connected: false,
            accounts: Vec::new(),
            pending: HashMap::new(),
        }
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn accounts(&self) -> &[String] {
        &self.accounts
    }

    /// Delivers pending session events to their waiters.
    fn pump(&mut self) -> Option<i32> {
        let mut login_result = None;
        for event in self.session.process_events() {
            match event {
                SessionEvent::Connected { err_code } => {
                    self.connected = err_code == 0;
                    login_result = Some(err_code);
                }
                SessionEvent::TrData {
                    request_name,
                    tr_code,
                } => {
                    if !self.pending.contains_key(&request_name) {
                        debug!("Ignoring data for unknown request {}", request_name);
                        continue;
                    }
                    let parsed = self.parse_tr_data(&tr_code);
                    if let (Some(data), Some(queue)) = (parsed, self.pending.get_mut(&request_name))
                    {
                        queue.push_back(data);
                    }
                }
            }
        }
        login_result
    }

    /// Logs in and loads the account list.
    pub fn login(&mut self) -> Result<()> {
        let ret = self.session.comm_connect();
        if ret != 0 {
            return Err(WorkerError::LoginRequestFailed(ret));
        }

        let started = Instant::now();
        while !self.connected {
            if let Some(err_code) = self.pump() {
                if err_code != 0 {
                    return Err(WorkerError::LoginRejected(err_code));
                }
                continue;
            }
            if started.elapsed() > self.settings.login_timeout {
                return Err(WorkerError::LoginTimeout(self.settings.login_timeout.as_secs()));
            }
            thread::sleep(self.settings.poll_interval);
        }

        self.accounts = self
            .session
            .login_info("ACCNO")
            .split(';')
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .collect();
        info!("Logged in, {} account(s)", self.accounts.len());
        Ok(())
    }

    /// Issues one request and pumps events until its data arrives or the
    /// request timeout elapses.
    fn request_tr(
        &mut self,
        tr_code: &str,
        request_name: &str,
        inputs: &[(&str, &str)],
    ) -> Result<TrData> {
        self.pending.insert(request_name.to_string(), VecDeque::new());
        let result = self.wait_for_tr(tr_code, request_name, inputs);
        self.pending.remove(request_name);
        result
    }

    fn wait_for_tr(
        &mut self,
        tr_code: &str,
        request_name: &str,
        inputs: &[(&str, &str)],
    ) -> Result<TrData> {
        for (key, value) in inputs {
            self.session.set_input_value(key, value);
        }
        let ret = self.session.comm_rq_data(request_name, tr_code, 0, SCREEN_NO);
        if ret != 0 {
            return Err(WorkerError::RequestFailed {
                name: request_name.to_string(),
                code: ret,
            });
        }
        pace(self.settings.request_pacing);

        let started = Instant::now();
        loop {
            self.pump();
            if let Some(data) = self
                .pending
                .get_mut(request_name)
                .and_then(VecDeque::pop_front)
            {
                return Ok(data);
            }
            if started.elapsed() > self.settings.request_timeout {
                return Err(WorkerError::RequestTimeout(request_name.to_string()));
            }
            pace(self.settings.poll_interval);
        }
    }

    fn parse_tr_data(&self, tr_code: &str) -> Option<TrData> {
        if tr_code.eq_ignore_ascii_case(&self.settings.tr_balance) {
            Some(TrData::Balance(self.parse_balance(tr_code)))
        } else if tr_code.eq_ignore_ascii_case(&self.settings.tr_holdings) {
            Some(TrData::Holdings(self.parse_holdings(tr_code)))
        } else {
            warn!("Unhandled TR {}", tr_code);
            None
        }
    }

    fn field(&self, tr_code: &str, record: &str, index: usize, item: &str) -> String {
        self.session
            .get_comm_data(tr_code, record, index, item)
            .trim()
            .to_string()
    }

    /// Stock balance is the vendor's total evaluation, not a derived value.
    fn parse_balance(&self, tr_code: &str) -> BalanceSnapshot {
        let amount = |item: &str| parse_decimal_or_zero(&self.field(tr_code, BALANCE_RECORD, 0, item));
        let stock = amount("총평가금액");
        BalanceSnapshot {
            account_number: String::new(),
            cash_balance: amount("예수금"),
            stock_balance: stock,
            total_balance: amount("총자산"),
            evaluation_amount: stock,
            profit_loss: amount("총손익금액"),
            profit_loss_rate: amount("총수익률(%)"),
        }
    }

    fn parse_holdings(&self, tr_code: &str) -> Vec<HoldingSnapshot> {
        let count = self.session.repeat_count(tr_code, HOLDINGS_RECORD);
        (0..count)
            .filter_map(|i| {
                let text = |item: &str| self.field(tr_code, HOLDINGS_RECORD, i, item);
                let amount = |item: &str| parse_decimal_or_zero(&text(item));
                let symbol = text("종목코드");
                if symbol.is_empty() {
                    return None;
                }
                Some(HoldingSnapshot {
                    account_number: String::new(),
                    symbol,
                    name: text("종목명"),
                    quantity: parse_i64_or_zero(&text("보유수량")),
                    average_price: amount("매입가"),
                    current_price: amount("현재가"),
                    evaluation_amount: amount("평가금액"),
                    profit_loss: amount("평가손익"),
                    // Reported in units of 1/10000.
                    profit_loss_rate: (amount("손익율") / Decimal::new(10_000, 0)).normalize(),
                })
            })
            .collect()
    }

    pub fn get_accounts(&self) -> Vec<AccountSnapshot> {
        self.accounts
            .iter()
            .map(|number| {
                AccountSnapshot::new(
                    number.clone(),
                    format!("{BROKER_LABEL} ({number})"),
                    "general",
                    BROKER_LABEL,
                )
            })
            .collect()
    }

    pub fn get_balance(&mut self, account_number: &str) -> Result<BalanceSnapshot> {
        let tr_code = self.settings.tr_balance.clone();
        let password = self.settings.account_password.clone();
        let media = self.settings.password_media.clone();
        let request_name = format!("balance_{account_number}");

        match self.request_tr(
            &tr_code,
            &request_name,
            &[
                ("계좌번호", account_number),
                ("비밀번호", password.as_str()),
                ("비밀번호입력매체구분", media.as_str()),
                ("조회구분", "1"),
            ],
        )? {
            TrData::Balance(mut balance) => {
                balance.account_number = account_number.to_string();
                Ok(balance)
            }
            TrData::Holdings(_) => Err(WorkerError::UnexpectedTr {
                name: request_name,
                tr_code,
            }),
        }
    }

    pub fn get_holdings(&mut self, account_number: &str) -> Result<Vec<HoldingSnapshot>> {
        let tr_code = self.settings.tr_holdings.clone();
        let password = self.settings.account_password.clone();
        let delisted = self.settings.delisted_filter.clone();
        let media = self.settings.password_media.clone();
        let exchange = self.settings.exchange_code.clone();
        let request_name = format!("holdings_{account_number}");

        match self.request_tr(
            &tr_code,
            &request_name,
            &[
                ("계좌번호", account_number),
                ("비밀번호", password.as_str()),
                ("상장폐지조회구분", delisted.as_str()),
                ("비밀번호입력매체구분", media.as_str()),
                ("거래소구분", exchange.as_str()),
            ],
        )? {
            TrData::Holdings(mut holdings) => {
                for holding in &mut holdings {
                    holding.account_number = account_number.to_string();
                }
                Ok(holdings)
            }
            TrData::Balance(_) => Err(WorkerError::UnexpectedTr {
                name: request_name,
                tr_code,
            }),
        }
    }

    pub fn terminate(&mut self) {
        if self.connected {
            self.session.comm_terminate();
            self.connected = false;
        }
    }

    /// Logs in, runs `command` and terminates the session.
    pub fn execute(&mut self, command: WorkerCommand, account: Option<&str>) -> Result<Value> {
        let result = self.login().and_then(|_| self.dispatch(command, account));
        self.terminate();
        result
    }

    fn dispatch(&mut self, command: WorkerCommand, account: Option<&str>) -> Result<Value> {
        let account = match (command.requires_account(), account) {
            (true, None) => return Err(WorkerError::MissingAccount(command.to_string())),
            (_, account) => account.unwrap_or_default(),
        };
        let value = match command {
            WorkerCommand::GetAccounts => serde_json::to_value(self.get_accounts()),
            WorkerCommand::GetBalance => serde_json::to_value(self.get_balance(account)?),
            WorkerCommand::GetHoldings => serde_json::to_value(self.get_holdings(account)?),
        };
        value.map_err(|e| WorkerError::SessionUnavailable(format!("cannot encode result: {e}")))
    }
}

fn pace(duration: Duration) {
    if !duration.is_zero() {
        thread::sleep(duration);
    }
}

/// Parses `args` (`<command> [account_number]`), runs the command against
/// the session produced by `open_session`, and returns the result document
/// with the process exit code.
///
/// Argument errors are reported before any session is opened.
pub fn run<S, F>(
    args: &[String],
    settings: WorkerSettings,
    open_session: F,
) -> (WorkerResponse<Value>, i32)
where
    S: VendorSession,
    F: FnOnce(&WorkerSettings) -> Result<S>,
{
    match try_run(args, settings, open_session) {
        Ok(data) => (WorkerResponse::ok(data), 0),
        Err(e) => {
            warn!("Worker failed: {}", e);
            (WorkerResponse::failure(e.to_string()), 1)
        }
    }
}

fn try_run<S, F>(args: &[String], settings: WorkerSettings, open_session: F) -> Result<Value>
where
    S: VendorSession,
    F: FnOnce(&WorkerSettings) -> Result<S>,
{
    let name = args.first().ok_or(WorkerError::MissingCommand)?;
    let command: WorkerCommand = name
        .parse()
        .map_err(|_| WorkerError::UnknownCommand(name.clone()))?;
    let account = args.get(1).map(String::as_str).filter(|a| !a.trim().is_empty());
    if command.requires_account() && account.is_none() {
        return Err(WorkerError::MissingAccount(command.to_string()));
    }

    let session = open_session(&settings)?;
    Worker::new(session, settings).execute(command, account)
}

#[cfg(test)]
mod tests;
