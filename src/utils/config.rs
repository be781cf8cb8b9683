use crate::core::DEFAULT_PROTOCOL_VERSION;
use crate::hardware::{InterfaceType, LinkConfig};
use crate::processing::TerminatorPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Longest inter-byte settle delay accepted (microseconds)
const MAX_SETTLE_DELAY_US: u64 = 1_000_000;

/// Protocol-wide configuration parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Version byte stamped on outgoing frames
    pub protocol_version: u8,
    /// Pause after every transmitted byte (microseconds)
    pub settle_delay_us: u64,
    /// Bound on each byte wait while receiving (milliseconds); `None` blocks forever
    pub receive_timeout_ms: Option<u64>,
    /// Whether the trailing END byte is verified
    pub terminator_policy: TerminatorPolicy,
    /// Raise the default log level to debug
    pub debug_logging: bool,
    /// Physical link settings
    pub link: LinkConfig,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            protocol_version: DEFAULT_PROTOCOL_VERSION,
            settle_delay_us: 100,
            receive_timeout_ms: None,
            terminator_policy: TerminatorPolicy::Lenient,
            debug_logging: false,
            link: LinkConfig::default(),
        }
    }
}

impl ProtocolConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_micros(self.settle_delay_us)
    }

    pub fn receive_timeout(&self) -> Option<Duration> {
        self.receive_timeout_ms.map(Duration::from_millis)
    }

    /// Check every parameter, reporting the first problem found
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.settle_delay_us > MAX_SETTLE_DELAY_US {
            return Err(ConfigError::InvalidParameter {
                parameter: "settle_delay_us".to_string(),
                value: self.settle_delay_us.to_string(),
                reason: format!("must be at most {}", MAX_SETTLE_DELAY_US),
            });
        }

        if self.receive_timeout_ms == Some(0) {
            return Err(ConfigError::InvalidParameter {
                parameter: "receive_timeout_ms".to_string(),
                value: "0".to_string(),
                reason: "use null to wait forever".to_string(),
            });
        }

        if self.link.interface == InterfaceType::Serial && self.link.device_path.is_none() {
            return Err(ConfigError::MissingParameter {
                parameter: "link.device_path".to_string(),
            });
        }

        self.link.validate().map_err(|e| ConfigError::InvalidParameter {
            parameter: "link".to_string(),
            value: format!("{:?}", self.link.interface),
            reason: e.to_string(),
        })
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {parameter} = {value}: {reason}")]
    InvalidParameter { parameter: String, value: String, reason: String },

    #[error("missing required parameter {parameter}")]
    MissingParameter { parameter: String },

    #[error("config file I/O error: {message}")]
    IoError { message: String },

    #[error("config serialization error: {message}")]
    SerializationError { message: String },
}

/// Owns the active configuration and its backing file
pub struct ConfigurationManager {
    config: ProtocolConfig,
    config_file_path: Option<String>,
    is_modified: bool,
}

impl ConfigurationManager {
    /// Create a new configuration manager with default settings
    pub fn new() -> Self {
        Self {
            config: ProtocolConfig::default(),
            config_file_path: None,
            is_modified: false,
        }
    }

    /// Create configuration manager and load from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut manager = Self::new();
        manager.load_from_file(path)?;
        Ok(manager)
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    /// Replace the whole configuration after validating it
    pub fn update_config(&mut self, config: ProtocolConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.config = config;
        self.is_modified = true;
        Ok(())
    }

    /// Load configuration from JSON file
    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let content = fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
            message: format!("Failed to read config file '{}': {}", path_str, e),
        })?;

        let config: ProtocolConfig =
            serde_json::from_str(&content).map_err(|e| ConfigError::SerializationError {
                message: format!("Failed to parse config file '{}': {}", path_str, e),
            })?;

        config.validate()?;

        self.config = config;
        self.config_file_path = Some(path_str);
        self.is_modified = false;
        Ok(())
    }

    /// Save configuration to JSON file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let content = serde_json::to_string_pretty(&self.config).map_err(|e| {
            ConfigError::SerializationError {
                message: format!("Failed to serialize config: {}", e),
            }
        })?;

        fs::write(&path, content).map_err(|e| ConfigError::IoError {
            message: format!("Failed to write config file '{}': {}", path_str, e),
        })?;

        self.config_file_path = Some(path_str);
        self.is_modified = false;
        Ok(())
    }

    /// Save to the currently loaded file path
    pub fn save(&mut self) -> Result<(), ConfigError> {
        if let Some(path) = self.config_file_path.clone() {
            self.save_to_file(path)
        } else {
            Err(ConfigError::IoError {
                message: "No file path set for saving configuration".to_string(),
            })
        }
    }

    /// Check if configuration has been modified since last save
    pub fn is_modified(&self) -> bool {
        self.is_modified
    }

    pub fn set_settle_delay(&mut self, settle_delay_us: u64) -> Result<u64, ConfigError> {
        if settle_delay_us > MAX_SETTLE_DELAY_US {
            return Err(ConfigError::InvalidParameter {
                parameter: "settle_delay_us".to_string(),
                value: settle_delay_us.to_string(),
                reason: format!("must be at most {}", MAX_SETTLE_DELAY_US),
            });
        }

        let previous = self.config.settle_delay_us;
        self.config.settle_delay_us = settle_delay_us;
        self.is_modified = true;
        Ok(previous)
    }

    /// Set or clear the receive bound; returns the previous value
    pub fn set_receive_timeout(&mut self, timeout_ms: Option<u64>) -> Result<Option<u64>, ConfigError> {
        if timeout_ms == Some(0) {
            return Err(ConfigError::InvalidParameter {
                parameter: "receive_timeout_ms".to_string(),
                value: "0".to_string(),
                reason: "use None to wait forever".to_string(),
            });
        }

        let previous = self.config.receive_timeout_ms;
        self.config.receive_timeout_ms = timeout_ms;
        self.is_modified = true;
        Ok(previous)
    }

    pub fn set_terminator_policy(&mut self, policy: TerminatorPolicy) -> TerminatorPolicy {
        let previous = self.config.terminator_policy;
        self.config.terminator_policy = policy;
        self.is_modified = true;
        previous
    }

    pub fn set_link(&mut self, link: LinkConfig) -> Result<(), ConfigError> {
        let mut candidate = self.config.clone();
        candidate.link = link;
        self.update_config(candidate)
    }
}

impl Default for ConfigurationManager {
    fn default() -> Self {
        Self::new()
    }
}
