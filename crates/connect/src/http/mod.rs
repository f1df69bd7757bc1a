//! REST broker integration.

mod client;
pub mod mapping;
mod transport;

pub use client::{ConnectionState, HttpBrokerClient};
pub use transport::{HttpMethod, HttpRequest, HttpResponse, ReqwestTransport, Transport};

#[cfg(test)]
mod tests;
