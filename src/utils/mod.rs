//! Configuration

pub mod config;

pub use config::{ConfigurationManager, ProtocolConfig, ConfigError};
