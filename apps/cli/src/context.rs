//! Wires configuration, storage, brokers and the pipeline for one command.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use stockfolio_connect::{BrokerRegistry, IngestionPipeline};
use stockfolio_core::analytics::AnalyticsService;
use stockfolio_core::config::{AppConfig, EnvOverrides};
use stockfolio_storage_sqlite::{
    AccountRepository, BalanceRepository, HoldingRepository, TransactionRepository,
};

pub fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    let overrides = EnvOverrides::from_env();
    if !overrides.is_empty() {
        info!("Applying environment overrides");
    }
    AppConfig::load(path, &overrides)
        .with_context(|| format!("loading configuration from {}", path.display()))
}

/// Repositories sharing one pool and writer.
pub struct Stores {
    pub accounts: Arc<AccountRepository>,
    pub balances: Arc<BalanceRepository>,
    pub holdings: Arc<HoldingRepository>,
    pub transactions: Arc<TransactionRepository>,
}

pub fn open_stores(config: &AppConfig) -> anyhow::Result<Stores> {
    let (pool, writer) = stockfolio_storage_sqlite::open(&config.database.path)
        .with_context(|| format!("opening database {}", config.database.path.display()))?;

    Ok(Stores {
        accounts: Arc::new(AccountRepository::new(Arc::clone(&pool), writer.clone())),
        balances: Arc::new(BalanceRepository::new(Arc::clone(&pool), writer.clone())),
        holdings: Arc::new(HoldingRepository::new(Arc::clone(&pool), writer.clone())),
        transactions: Arc::new(TransactionRepository::new(pool, writer)),
    })
}

/// Opens the store and connects every enabled broker to a pipeline.
pub fn build_pipeline(config: &AppConfig) -> anyhow::Result<IngestionPipeline> {
    let stores = open_stores(config)?;

    let registry = Arc::new(BrokerRegistry::from_config(config));
    info!("{} broker(s) registered", registry.get_all().len());

    Ok(IngestionPipeline::new(
        registry,
        stores.accounts,
        stores.balances,
        stores.holdings,
        stores.transactions,
    ))
}

pub fn build_analytics(stores: &Stores) -> AnalyticsService {
    AnalyticsService::new(
        stores.balances.clone(),
        stores.holdings.clone(),
        stores.transactions.clone(),
    )
}
