//! Log shipper configuration

use crate::error::ConfigError;
use garde::Validate;
use serde::{Deserialize, Serialize};
use stackline_common::defaults::{
    default_log_group, default_log_stream, default_max_batch_size, default_region,
    default_shutdown_timeout_secs,
};
use std::path::Path;
use std::time::Duration;

/// CloudWatch Logs accepts at most this many events per call
pub const MAX_EVENTS_PER_CALL: usize = 10_000;

/// Where log events go and how the worker submits them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ShipperConfig {
    /// AWS region of the log store
    #[serde(default = "default_region")]
    #[garde(length(min = 1))]
    pub region: String,

    /// Log group name
    #[serde(default = "default_log_group")]
    #[garde(length(min = 1, max = 512))]
    pub log_group: String,

    /// Log stream name
    #[serde(default = "default_log_stream")]
    #[garde(length(min = 1, max = 512))]
    pub log_stream: String,

    /// Maximum queued events sent in one call (1 = one call per record)
    #[serde(default = "default_max_batch_size")]
    #[garde(range(min = 1, max = MAX_EVENTS_PER_CALL))]
    pub max_batch_size: usize,

    /// Seconds `shutdown` waits for queued events
    #[serde(default = "default_shutdown_timeout_secs")]
    #[garde(skip)]
    pub shutdown_timeout_secs: u64,

    /// Create the log group and stream before shipping
    #[serde(default)]
    #[garde(skip)]
    pub create_destination: bool,
}

impl Default for ShipperConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            log_group: default_log_group(),
            log_stream: default_log_stream(),
            max_batch_size: default_max_batch_size(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
            create_destination: false,
        }
    }
}

impl ShipperConfig {
    /// Parse and validate a JSON document
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.check()?;
        Ok(config)
    }

    /// Validate field ranges, e.g. after applying command-line overrides
    pub fn check(&self) -> Result<(), ConfigError> {
        self.validate()?;
        Ok(())
    }

    /// Read, parse and validate a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::io(path.display().to_string(), e))?;
        Self::from_json(&json)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}
