//! Options handed to the dialer and handshaker when a connection is opened.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::port::Handshaker;

/// Transport security parameters, interpreted by the [`Dialer`](crate::port::Dialer).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TlsConfig {
    /// PEM file with additional trusted CA certificates.
    #[serde(default)]
    pub ca_file: Option<PathBuf>,
    /// Skip certificate and hostname verification.
    #[serde(default)]
    pub insecure: bool,
}

/// Per-connection establishment options.
#[derive(Clone, Deserialize)]
pub struct ConnectionOptions {
    /// Upper bound on dial plus handshake (milliseconds).
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Client name reported to the server during the handshake.
    #[serde(default)]
    pub app_name: Option<String>,
    #[serde(default)]
    pub tls: Option<TlsConfig>,
    /// Wraps connection establishment, typically with authentication.
    #[serde(skip)]
    pub handshaker: Option<Arc<dyn Handshaker>>,
}

const fn default_connect_timeout_ms() -> u64 {
    30_000
}

impl ConnectionOptions {
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    #[must_use]
    pub fn with_handshaker(mut self, handshaker: Arc<dyn Handshaker>) -> Self {
        self.handshaker = Some(handshaker);
        self
    }

    #[must_use]
    pub fn with_tls(mut self, tls: TlsConfig) -> Self {
        self.tls = Some(tls);
        self
    }

    /// # Errors
    ///
    /// `connect_timeout_ms` must be > 0.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.connect_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "connect_timeout_ms",
                reason: "must be > 0".into(),
            });
        }
        Ok(())
    }
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            app_name: None,
            tls: None,
            handshaker: None,
        }
    }
}

impl fmt::Debug for ConnectionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionOptions")
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .field("app_name", &self.app_name)
            .field("tls", &self.tls)
            .field("handshaker", &self.handshaker.as_ref().map(|_| "<handshaker>"))
            .finish()
    }
}
