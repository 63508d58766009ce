//! Server monitor timing configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Interval between scheduled probes (milliseconds).
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    /// Minimum spacing between probes when an immediate check is requested
    /// (milliseconds).
    #[serde(default = "default_min_heartbeat_interval_ms")]
    pub min_heartbeat_interval_ms: u64,
}

const fn default_heartbeat_interval_ms() -> u64 {
    10_000
}

const fn default_min_heartbeat_interval_ms() -> u64 {
    500
}

impl MonitorConfig {
    #[must_use]
    pub const fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    #[must_use]
    pub const fn min_heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.min_heartbeat_interval_ms)
    }

    /// # Errors
    ///
    /// The heartbeat interval must be > 0 and not shorter than the minimum
    /// interval.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.heartbeat_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "heartbeat_interval_ms",
                reason: "must be > 0".into(),
            });
        }
        if self.min_heartbeat_interval_ms > self.heartbeat_interval_ms {
            return Err(ConfigError::InvalidValue {
                field: "min_heartbeat_interval_ms",
                reason: "must be <= heartbeat_interval_ms".into(),
            });
        }
        Ok(())
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            min_heartbeat_interval_ms: default_min_heartbeat_interval_ms(),
        }
    }
}
