//! Broker connection models.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How a broker integration talks to its vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiKind {
    /// REST API authenticated with a bearer token.
    #[serde(alias = "kis")]
    Http,
    /// Vendor API reachable only through an out-of-process worker.
    #[serde(alias = "kiwoom")]
    Subprocess,
}

impl fmt::Display for ApiKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiKind::Http => f.write_str("http"),
            ApiKind::Subprocess => f.write_str("subprocess"),
        }
    }
}

/// Runtime connection state of a registered broker. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerConnection {
    pub broker_name: String,
    pub api_kind: ApiKind,
    pub connected: bool,
}
