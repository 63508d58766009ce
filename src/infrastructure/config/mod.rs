//! Configuration sections and loading.

pub mod connection;
pub mod logging;
pub mod monitor;
pub mod pool;
pub mod settings;

pub use connection::{ConnectionOptions, TlsConfig};
pub use logging::LoggingConfig;
pub use monitor::MonitorConfig;
pub use pool::PoolConfig;
pub use settings::{Config, ServerConfig};
