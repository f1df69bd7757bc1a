//! Application configuration.
//!
//! Configuration is assembled once at startup: a JSON document is parsed into
//! [`AppConfig`], named environment overrides are applied from
//! [`EnvOverrides`], then the result is validated and passed by reference into
//! constructors.

mod config_model;
mod env_overrides;

pub use config_model::*;
pub use env_overrides::EnvOverrides;
