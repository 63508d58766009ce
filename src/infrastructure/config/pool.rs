//! Connection pool sizing configuration.

use std::time::Duration;

use serde::Deserialize;
use tokio::sync::Semaphore;

use crate::error::ConfigError;

/// Capacity limits for one server's connection pool.
#[derive(Debug, Clone, Deserialize)]
pub struct PoolConfig {
    /// Maximum number of live connections (idle plus checked out).
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Maximum number of idle connections kept for reuse.
    ///
    /// Values above `max_connections` are effectively capped by it.
    #[serde(default = "default_max_idle_connections")]
    pub max_idle_connections: usize,
    /// Idle connections older than this are closed instead of reused.
    #[serde(default)]
    pub max_idle_time_ms: Option<u64>,
}

const fn default_max_connections() -> usize {
    100
}

const fn default_max_idle_connections() -> usize {
    100
}

impl PoolConfig {
    /// Pool config with the given limits and no idle expiry.
    #[must_use]
    pub const fn new(max_connections: usize, max_idle_connections: usize) -> Self {
        Self {
            max_connections,
            max_idle_connections,
            max_idle_time_ms: None,
        }
    }

    /// Idle list capacity actually enforced.
    #[must_use]
    pub fn idle_capacity(&self) -> usize {
        self.max_idle_connections.min(self.max_connections)
    }

    #[must_use]
    pub fn max_idle_time(&self) -> Option<Duration> {
        self.max_idle_time_ms.map(Duration::from_millis)
    }

    /// # Errors
    ///
    /// `max_connections` must be in `1..=Semaphore::MAX_PERMITS` and
    /// `max_idle_time_ms`, when set, > 0.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_connections",
                reason: "must be > 0".into(),
            });
        }
        if self.max_connections > Semaphore::MAX_PERMITS {
            return Err(ConfigError::InvalidValue {
                field: "max_connections",
                reason: format!("must be <= {}", Semaphore::MAX_PERMITS),
            });
        }
        if self.max_idle_time_ms == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "max_idle_time_ms",
                reason: "must be > 0 when set".into(),
            });
        }
        Ok(())
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new(default_max_connections(), default_max_idle_connections())
    }
}
