//! Builders
//!
//! Fluent builder for client configuration.

pub mod config;

pub use config::{minimax_config, MinimaxConfigBuilder};
