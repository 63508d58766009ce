//! Nodepool - per-server connection pooling and state monitoring for
//! database client drivers.
//!
//! For one addressable server endpoint this crate keeps a bounded pool of
//! reusable connections and a live description of the server's health and
//! role, published to any number of subscribers (typically a cluster
//! topology aggregator routing operations across many servers).
//!
//! # Architecture
//!
//! - **`Server`** - Facade with a one-way `operating -> closed` lifecycle
//!   - `ConnectionPool` - Bounded checkout with deadline/cancellation, drain
//!     by generation, idempotent close
//!   - Monitor - Background task probing on a heartbeat, draining the pool on
//!     persistent failures
//!   - `Broadcaster` - Latest-wins fan-out of `ServerDescription`s
//!
//! - **`port`** - Traits for the collaborators a driver supplies: dialer,
//!   handshaker, prober
//!
//! # Modules
//!
//! - [`context`] - Deadline and cancellation for checkout
//! - [`domain`] - Addresses, identifiers and server descriptions
//! - [`error`] - Error types for the crate
//! - [`infrastructure`] - Pool, broadcaster, config, TCP implementations
//! - [`port`] - Collaborator traits
//! - [`server`] - The per-server facade
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use nodepool::infrastructure::net::{PingProber, TcpDialer};
//! use nodepool::{Address, Context, Server, ServerConfig};
//!
//! # async fn run() -> nodepool::Result<()> {
//! let server = Server::new(
//!     Address::parse("localhost:27017")?,
//!     ServerConfig::default().with_max_connections(10),
//!     Arc::new(TcpDialer),
//!     Arc::new(PingProber),
//! )?;
//!
//! let conn = server
//!     .connection(&Context::with_timeout(Duration::from_secs(1)))
//!     .await?;
//! drop(conn);
//!
//! server.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod context;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;
pub mod server;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;

pub use context::Context;
pub use domain::{Address, FailureClass, ServerDescription, ServerError, ServerKind};
pub use error::{ConfigError, Error, Result};
pub use infrastructure::classify::{DefaultClassifier, FailureClassifier};
pub use infrastructure::config::{Config, ConnectionOptions, MonitorConfig, PoolConfig, ServerConfig};
pub use infrastructure::pool::{ConnectionState, PoolStats, PooledConnection};
pub use infrastructure::subscription::Subscription;
pub use server::Server;
