//! Stockfolio Connect - broker connections and data ingestion.
//!
//! - [`BrokerClient`]: the capability set every brokerage integration offers
//! - [`HttpBrokerClient`]: REST vendors with bearer tokens, retry and rate limiting
//! - [`SubprocessBrokerClient`]: vendors reachable only through a worker process
//! - [`TokenStore`]: on-disk token lifecycle, one scope per broker
//! - [`BrokerRegistry`] and [`IngestionPipeline`]: fan-out and reconciliation

pub mod broker;
pub mod http;
pub mod ingestion;
pub mod registry;
pub mod subprocess;
pub mod token_store;

#[cfg(test)]
mod testing;

pub use broker::BrokerClient;
pub use http::{ConnectionState, HttpBrokerClient, ReqwestTransport, Transport};
pub use ingestion::IngestionPipeline;
pub use registry::BrokerRegistry;
pub use subprocess::SubprocessBrokerClient;
pub use token_store::{TokenExpiryInfo, TokenRecord, TokenStore, DEFAULT_REFRESH_THRESHOLD_SECS};
