//! In-memory broker used by registry and ingestion tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::broker::BrokerClient;
use stockfolio_core::accounts::AccountSnapshot;
use stockfolio_core::balances::BalanceSnapshot;
use stockfolio_core::brokers::ApiKind;
use stockfolio_core::errors::{BrokerError, Error, Result};
use stockfolio_core::holdings::HoldingSnapshot;
use stockfolio_core::transactions::{TransactionDirection, TransactionRecord};

pub struct MockBrokerClient {
    name: String,
    account_numbers: Vec<String>,
    reported_broker: Option<String>,
    holdings: Mutex<Vec<String>>,
    cash: Mutex<Decimal>,
    failing_balance: HashSet<String>,
    fail_accounts: bool,
    fail_connect: bool,
    fail_disconnect: bool,
    connected: AtomicBool,
    pub balance_calls: AtomicUsize,
}

impl MockBrokerClient {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            account_numbers: Vec::new(),
            reported_broker: None,
            holdings: Mutex::new(vec!["005930".to_string(), "000660".to_string()]),
            cash: Mutex::new(dec!(1000000)),
            failing_balance: HashSet::new(),
            fail_accounts: false,
            fail_connect: false,
            fail_disconnect: false,
            connected: AtomicBool::new(false),
            balance_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_accounts(mut self, numbers: &[&str]) -> Self {
        self.account_numbers = numbers.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn with_reported_broker(mut self, broker: &str) -> Self {
        self.reported_broker = Some(broker.to_string());
        self
    }

    pub fn failing_balance_for(mut self, account_number: &str) -> Self {
        self.failing_balance.insert(account_number.to_string());
        self
    }

    pub fn failing_accounts(mut self) -> Self {
        self.fail_accounts = true;
        self
    }

    pub fn failing_connect(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    pub fn failing_disconnect(mut self) -> Self {
        self.fail_disconnect = true;
        self
    }

    pub fn set_holdings(&self, symbols: &[&str]) {
        *self.holdings.lock().unwrap() = symbols.iter().map(|s| s.to_string()).collect();
    }

    pub fn set_cash(&self, cash: Decimal) {
        *self.cash.lock().unwrap() = cash;
    }
}

#[async_trait]
impl BrokerClient for MockBrokerClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn api_kind(&self) -> ApiKind {
        ApiKind::Http
    }

    async fn connect(&self) -> Result<bool> {
        if self.fail_connect {
            return Err(Error::Authentication("rejected app key".to_string()));
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(true)
    }

    async fn disconnect(&self) -> Result<bool> {
        self.connected.store(false, Ordering::SeqCst);
        if self.fail_disconnect {
            return Err(BrokerError::Transport("socket closed".to_string()).into());
        }
        Ok(true)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn get_accounts(&self) -> Result<Vec<AccountSnapshot>> {
        if self.fail_accounts {
            return Err(BrokerError::Timeout("Worker".to_string()).into());
        }
        let broker = self.reported_broker.as_deref().unwrap_or(&self.name);
        Ok(self
            .account_numbers
            .iter()
            .map(|n| AccountSnapshot::new(n.clone(), format!("{broker} ({n})"), "general", broker))
            .collect())
    }

    async fn get_balance(&self, account_number: &str) -> Result<BalanceSnapshot> {
        self.balance_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_balance.contains(account_number) {
            return Err(BrokerError::Http {
                status: 500,
                body: "internal error".to_string(),
            }
            .into());
        }
        let cash = *self.cash.lock().unwrap();
        Ok(BalanceSnapshot {
            account_number: account_number.to_string(),
            cash_balance: cash,
            total_balance: cash + dec!(2000000),
            evaluation_amount: dec!(2000000),
            profit_loss: dec!(150000),
            profit_loss_rate: dec!(8.1),
            ..Default::default()
        }
        .with_derived_stock_balance())
    }

    async fn get_holdings(&self, account_number: &str) -> Result<Vec<HoldingSnapshot>> {
        Ok(self
            .holdings
            .lock()
            .unwrap()
            .iter()
            .map(|symbol| HoldingSnapshot {
                account_number: account_number.to_string(),
                symbol: symbol.clone(),
                name: format!("Stock {symbol}"),
                quantity: 10,
                average_price: dec!(50000),
                current_price: dec!(55000),
                evaluation_amount: dec!(550000),
                profit_loss: dec!(50000),
                profit_loss_rate: dec!(10),
            })
            .collect())
    }

    async fn get_transactions(
        &self,
        account_number: &str,
        start_date: NaiveDate,
        _end_date: NaiveDate,
    ) -> Result<Vec<TransactionRecord>> {
        Ok(vec![
            TransactionRecord {
                account_number: account_number.to_string(),
                transaction_date: start_date,
                symbol: "005930".to_string(),
                name: "Stock 005930".to_string(),
                direction: TransactionDirection::Buy,
                quantity: 5,
                price: dec!(70000),
                amount: dec!(350000),
                fee: dec!(52),
            },
            TransactionRecord {
                account_number: account_number.to_string(),
                transaction_date: start_date,
                symbol: "000660".to_string(),
                name: "Stock 000660".to_string(),
                direction: TransactionDirection::Sell,
                quantity: 2,
                price: dec!(180000),
                amount: dec!(360000),
                fee: dec!(54),
            },
        ])
    }
}
