//! Named set of active broker clients built from configuration.

use std::sync::Arc;

use chrono::NaiveDate;
use log::{error, info, warn};

use crate::broker::BrokerClient;
use crate::http::HttpBrokerClient;
use crate::subprocess::SubprocessBrokerClient;
use crate::token_store::TokenStore;
use stockfolio_core::accounts::AccountSnapshot;
use stockfolio_core::balances::BalanceSnapshot;
use stockfolio_core::brokers::{ApiKind, BrokerConnection};
use stockfolio_core::config::{AppConfig, BrokerConfig};
use stockfolio_core::errors::{BrokerError, Result};
use stockfolio_core::holdings::HoldingSnapshot;
use stockfolio_core::transactions::TransactionRecord;

/// Owns every enabled [`BrokerClient`], in configuration order.
#[derive(Default)]
pub struct BrokerRegistry {
    clients: Vec<Arc<dyn BrokerClient>>,
}

impl BrokerRegistry {
    pub fn new(clients: Vec<Arc<dyn BrokerClient>>) -> Self {
        Self { clients }
    }

    /// Builds a client for every enabled broker. Disabled entries are skipped,
    /// and a broker that fails to construct is logged and left out.
    pub fn from_config(config: &AppConfig) -> Self {
        let mut clients: Vec<Arc<dyn BrokerClient>> = Vec::new();
        for broker in &config.brokers {
            if !broker.enabled {
                info!("Broker {} is disabled, skipping", broker.name);
                continue;
            }
            match build_client(config, broker) {
                Ok(client) => {
                    info!("Registered broker {} ({})", broker.name, broker.api_type);
                    clients.push(client);
                }
                Err(e) => error!("Failed to initialize broker {}: {}", broker.name, e),
            }
        }
        Self { clients }
    }

    /// Adds a client, replacing any registered under the same name.
    pub fn register(&mut self, client: Arc<dyn BrokerClient>) {
        self.clients.retain(|c| c.name() != client.name());
        self.clients.push(client);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn BrokerClient>> {
        self.clients.iter().find(|c| c.name() == name).cloned()
    }

    pub fn get_all(&self) -> &[Arc<dyn BrokerClient>] {
        &self.clients
    }

    pub fn names(&self) -> Vec<String> {
        self.clients.iter().map(|c| c.name().to_string()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    fn require(&self, name: &str) -> Result<Arc<dyn BrokerClient>> {
        self.get(name)
            .ok_or_else(|| BrokerError::UnknownBroker(name.to_string()).into())
    }

    async fn require_connected(&self, name: &str) -> Result<Arc<dyn BrokerClient>> {
        let client = self.require(name)?;
        if !client.is_connected() {
            client.connect().await?;
        }
        Ok(client)
    }

    pub async fn connect(&self, name: &str) -> Result<bool> {
        self.require(name)?.connect().await
    }

    pub async fn disconnect(&self, name: &str) -> Result<bool> {
        self.require(name)?.disconnect().await
    }

    /// Accounts of every broker, each tagged with its owning broker.
    ///
    /// Brokers that cannot connect or list accounts are skipped.
    pub async fn get_all_accounts(&self) -> Vec<AccountSnapshot> {
        let mut all = Vec::new();
        for client in &self.clients {
            if !client.is_connected() {
                if let Err(e) = client.connect().await {
                    warn!("[{}] Connect failed, skipping: {}", client.name(), e);
                    continue;
                }
            }
            match client.get_accounts().await {
                Ok(accounts) => {
                    all.extend(accounts.into_iter().map(|mut account| {
                        account.broker_name = client.name().to_string();
                        account
                    }));
                }
                Err(e) => warn!("[{}] Account listing failed, skipping: {}", client.name(), e),
            }
        }
        all
    }

    pub async fn get_account_balance(
        &self,
        broker_name: &str,
        account_number: &str,
    ) -> Result<BalanceSnapshot> {
        self.require_connected(broker_name)
            .await?
            .get_balance(account_number)
            .await
    }

    pub async fn get_account_holdings(
        &self,
        broker_name: &str,
        account_number: &str,
    ) -> Result<Vec<HoldingSnapshot>> {
        self.require_connected(broker_name)
            .await?
            .get_holdings(account_number)
            .await
    }

    pub async fn get_account_transactions(
        &self,
        broker_name: &str,
        account_number: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<TransactionRecord>> {
        self.require_connected(broker_name)
            .await?
            .get_transactions(account_number, start_date, end_date)
            .await
    }

    pub fn broker_info(&self) -> Vec<BrokerConnection> {
        self.clients.iter().map(|c| c.connection()).collect()
    }

    /// Disconnects every client. Individual failures are logged and ignored.
    pub async fn close_all(&self) {
        for client in &self.clients {
            if let Err(e) = client.disconnect().await {
                warn!("[{}] Disconnect failed: {}", client.name(), e);
            }
        }
        info!("Closed {} broker connection(s)", self.clients.len());
    }
}

fn build_client(config: &AppConfig, broker: &BrokerConfig) -> Result<Arc<dyn BrokerClient>> {
    Ok(match broker.api_type {
        ApiKind::Http => {
            let store = TokenStore::open(&config.token_dir, &broker.name)?;
            Arc::new(HttpBrokerClient::from_config(broker, store)?)
        }
        ApiKind::Subprocess => Arc::new(SubprocessBrokerClient::from_config(broker)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockBrokerClient;
    use stockfolio_core::config::{ApiSettings, Credentials, DatabaseConfig};

    fn registry_of(clients: Vec<MockBrokerClient>) -> BrokerRegistry {
        BrokerRegistry::new(
            clients
                .into_iter()
                .map(|c| Arc::new(c) as Arc<dyn BrokerClient>)
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_failing_broker_is_skipped_in_account_fan_out() {
        let healthy = MockBrokerClient::new("kis").with_accounts(&["5012345601"]);
        let broken = MockBrokerClient::new("kiwoom").failing_accounts();
        let registry = registry_of(vec![healthy, broken]);

        let accounts = registry.get_all_accounts().await;
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].account_number, "5012345601");
        assert_eq!(accounts[0].broker_name, "kis");
    }

    #[tokio::test]
    async fn test_accounts_are_tagged_with_owning_broker() {
        // The client reports a vendor label; the registry name wins.
        let client = MockBrokerClient::new("kiwoom-main")
            .with_accounts(&["8011223311", "8011223312"])
            .with_reported_broker("Kiwoom");
        let registry = registry_of(vec![client]);

        let accounts = registry.get_all_accounts().await;
        assert_eq!(accounts.len(), 2);
        assert!(accounts.iter().all(|a| a.broker_name == "kiwoom-main"));
    }

    #[tokio::test]
    async fn test_fan_out_connects_lazily_and_skips_unreachable() {
        let lazy = MockBrokerClient::new("kis").with_accounts(&["5012345601"]);
        let unreachable = MockBrokerClient::new("kiwoom")
            .with_accounts(&["8011223311"])
            .failing_connect();
        let registry = registry_of(vec![lazy, unreachable]);

        let accounts = registry.get_all_accounts().await;
        assert_eq!(accounts.len(), 1);

        let info = registry.broker_info();
        assert_eq!(info.len(), 2);
        assert!(info[0].connected);
        assert!(!info[1].connected);
    }

    #[tokio::test]
    async fn test_unknown_broker_lookups() {
        let registry = registry_of(vec![MockBrokerClient::new("kis")]);

        assert!(registry.get("kis").is_some());
        assert!(registry.get("nope").is_none());

        let err = registry
            .get_account_balance("nope", "5012345601")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            stockfolio_core::Error::Broker(BrokerError::UnknownBroker(ref name)) if name == "nope"
        ));
        assert!(registry.connect("nope").await.is_err());
    }

    #[tokio::test]
    async fn test_delegation_connects_first() {
        let registry = registry_of(vec![MockBrokerClient::new("kis").with_accounts(&["5012345601"])]);

        let balance = registry
            .get_account_balance("kis", "5012345601")
            .await
            .unwrap();
        assert_eq!(balance.account_number, "5012345601");
        assert!(registry.get("kis").unwrap().is_connected());

        let holdings = registry
            .get_account_holdings("kis", "5012345601")
            .await
            .unwrap();
        assert!(!holdings.is_empty());
    }

    #[tokio::test]
    async fn test_close_all_swallows_failures() {
        let ok = MockBrokerClient::new("kis");
        let failing = MockBrokerClient::new("kiwoom").failing_disconnect();
        let registry = registry_of(vec![ok, failing]);

        registry.connect("kis").await.unwrap();
        registry.close_all().await;
        assert!(!registry.get("kis").unwrap().is_connected());
    }

    #[test]
    fn test_register_replaces_same_name() {
        let mut registry = registry_of(vec![MockBrokerClient::new("kis")]);
        registry.register(Arc::new(MockBrokerClient::new("kis")));
        registry.register(Arc::new(MockBrokerClient::new("kiwoom")));
        assert_eq!(registry.names(), vec!["kis", "kiwoom"]);
    }

    #[test]
    fn test_from_config_skips_disabled_and_broken_entries() {
        let dir = tempfile::tempdir().unwrap();
        let broker = |name: &str, api_type: ApiKind, enabled: bool| BrokerConfig {
            name: name.to_string(),
            api_type,
            enabled,
            credentials: Credentials::new("PSkey", "secret"),
            api_settings: ApiSettings::default(),
        };

        let config = AppConfig {
            database: DatabaseConfig {
                path: dir.path().join("db.sqlite"),
            },
            token_dir: dir.path().join("tokens"),
            brokers: vec![
                broker("kis", ApiKind::Http, true),
                broker("kis-paper", ApiKind::Http, false),
                // No worker path: construction fails and the entry is dropped.
                broker("kiwoom", ApiKind::Subprocess, true),
            ],
        };

        let registry = BrokerRegistry::from_config(&config);
        assert_eq!(registry.names(), vec!["kis"]);
        assert_eq!(registry.get("kis").unwrap().api_kind(), ApiKind::Http);
        assert!(config.token_dir.join("kis").exists());
    }
}
