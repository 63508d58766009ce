//! Server and file-level configuration loading and validation.
//!
//! [`ServerConfig`] is the construction-time configuration of one
//! [`Server`](crate::Server). [`Config`] wraps it with an address and logging
//! settings for loading from a TOML file:
//!
//! ```toml
//! address = "db0.example.com:27017"
//!
//! [logging]
//! level = "debug"
//!
//! [pool]
//! max_connections = 20
//! max_idle_connections = 5
//!
//! [monitor]
//! heartbeat_interval_ms = 5000
//!
//! [connection]
//! connect_timeout_ms = 2000
//! ```

use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use super::connection::ConnectionOptions;
use super::logging::LoggingConfig;
use super::monitor::MonitorConfig;
use super::pool::PoolConfig;
use crate::domain::Address;
use crate::error::{ConfigError, Result};
use crate::infrastructure::classify::{DefaultClassifier, FailureClassifier};

/// Construction-time configuration of a single server.
///
/// Applied once by [`Server::new`](crate::Server::new); changing a config
/// value afterwards has no effect on existing servers.
#[derive(Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub connection: ConnectionOptions,
    /// Decides which failures drain the pool.
    #[serde(skip, default = "default_classifier")]
    pub classifier: Arc<dyn FailureClassifier>,
}

fn default_classifier() -> Arc<dyn FailureClassifier> {
    Arc::new(DefaultClassifier)
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            pool: PoolConfig::default(),
            monitor: MonitorConfig::default(),
            connection: ConnectionOptions::default(),
            classifier: default_classifier(),
        }
    }
}

impl ServerConfig {
    #[must_use]
    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.pool.max_connections = max;
        self
    }

    #[must_use]
    pub fn with_max_idle_connections(mut self, max: usize) -> Self {
        self.pool.max_idle_connections = max;
        self
    }

    #[must_use]
    pub fn with_connection_options(mut self, options: ConnectionOptions) -> Self {
        self.connection = options;
        self
    }

    #[must_use]
    pub fn with_classifier(mut self, classifier: Arc<dyn FailureClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Validate every section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        self.pool.validate()?;
        self.monitor.validate()?;
        self.connection.validate()?;
        Ok(())
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("pool", &self.pool)
            .field("monitor", &self.monitor)
            .field("connection", &self.connection)
            .finish_non_exhaustive()
    }
}

/// File-level configuration for the `nodepool` binary and embedding apps.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Server to manage; the CLI lets a positional argument override it.
    #[serde(default)]
    pub address: Option<Address>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(flatten)]
    pub server: ServerConfig,
}

impl Config {
    /// Load and validate configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid TOML, or
    /// fails validation.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not valid TOML or fails validation.
    pub fn parse_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.server.validate()?;
        Ok(config)
    }

    /// Install the tracing subscriber described by `[logging]`.
    pub fn init_logging(&self) -> bool {
        self.logging.init()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::parse_toml("").unwrap();
        assert!(config.address.is_none());
        assert_eq!(config.server.pool.max_connections, 100);
        assert_eq!(config.server.pool.max_idle_connections, 100);
        assert_eq!(config.server.monitor.heartbeat_interval_ms, 10_000);
        assert_eq!(config.server.connection.connect_timeout_ms, 30_000);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn parses_all_sections() {
        let config = Config::parse_toml(
            r#"
address = "DB0.example.com"

[logging]
level = "debug"
format = "json"

[pool]
max_connections = 4
max_idle_connections = 2
max_idle_time_ms = 60000

[monitor]
heartbeat_interval_ms = 1000
min_heartbeat_interval_ms = 100

[connection]
connect_timeout_ms = 500
app_name = "reporting"

[connection.tls]
insecure = true
"#,
        )
        .unwrap();

        assert_eq!(
            config.address.map(|a| a.to_string()).as_deref(),
            Some("db0.example.com:27017")
        );
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.server.pool.max_connections, 4);
        assert_eq!(config.server.pool.idle_capacity(), 2);
        assert_eq!(config.server.monitor.min_heartbeat_interval_ms, 100);
        assert_eq!(config.server.connection.app_name.as_deref(), Some("reporting"));
        assert!(config.server.connection.tls.as_ref().is_some_and(|t| t.insecure));
        assert!(config.server.connection.handshaker.is_none());
    }

    #[test]
    fn rejects_zero_max_connections() {
        let result = Config::parse_toml("[pool]\nmax_connections = 0\n");
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::InvalidValue {
                field: "max_connections",
                ..
            }))
        ));
    }

    #[test]
    fn rejects_min_heartbeat_above_heartbeat() {
        let result = Config::parse_toml(
            "[monitor]\nheartbeat_interval_ms = 100\nmin_heartbeat_interval_ms = 200\n",
        );
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::InvalidValue {
                field: "min_heartbeat_interval_ms",
                ..
            }))
        ));
    }

    #[test]
    fn rejects_bad_address() {
        let result = Config::parse_toml("address = \"host:notaport\"\n");
        assert!(matches!(result, Err(Error::Config(ConfigError::Parse(_)))));
    }

    #[test]
    fn idle_capacity_is_capped_by_max_connections() {
        let config = ServerConfig::default()
            .with_max_connections(2)
            .with_max_idle_connections(10);
        assert_eq!(config.pool.idle_capacity(), 2);
        assert!(config.validate().is_ok());
    }
}
