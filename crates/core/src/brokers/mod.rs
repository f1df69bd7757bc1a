//! Broker integration models and the worker wire protocol.

mod brokers_model;
pub mod worker_protocol;

pub use brokers_model::{ApiKind, BrokerConnection};
pub use worker_protocol::{WorkerCommand, WorkerResponse};
