use thiserror::Error;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),

    #[error("invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },
}

/// Errors surfaced by the pool, the broadcaster and the server facade.
///
/// The lifecycle and cancellation variants are sentinels: callers match on
/// them by variant, never by message.
#[derive(Error, Debug)]
pub enum Error {
    /// The pool (or the server owning it) has been closed.
    #[error("connection pool is closed")]
    PoolClosed,

    /// A subscription was requested after the server shut down its broadcaster.
    #[error("cannot subscribe after the server is closed")]
    SubscribeAfterClosed,

    /// The caller's context deadline passed before the operation finished.
    #[error("context deadline exceeded")]
    DeadlineExceeded,

    /// The caller's cancellation token fired before the operation finished.
    #[error("context cancelled")]
    Cancelled,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connect to {address} timed out")]
    ConnectTimeout { address: String },

    #[error("handshake failed: {0}")]
    Handshake(String),

    /// A prober got a reply it could not interpret. Returned by
    /// [`PingProber`](crate::infrastructure::net::PingProber) and meant for
    /// driver-supplied probers too; classified as transient.
    #[error("probe failed: {0}")]
    Probe(String),
}

impl Error {
    /// True for the sentinels that signal the caller's context ended.
    #[must_use]
    pub const fn is_cancellation(&self) -> bool {
        matches!(self, Self::DeadlineExceeded | Self::Cancelled)
    }

    /// True for the lifecycle sentinels raised once the server is closed.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::PoolClosed | Self::SubscribeAfterClosed)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
