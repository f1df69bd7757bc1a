//! Broker integration through an out-of-process worker.

mod client;

pub use client::SubprocessBrokerClient;
