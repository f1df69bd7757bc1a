mod traits;

pub use traits::BrokerClient;
