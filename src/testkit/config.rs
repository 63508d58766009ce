//! Canonical test configurations.
//!
//! Single source of truth for config structs used across tests. Heartbeats
//! are short so monitor behavior shows up within a few tens of milliseconds.

use crate::infrastructure::config::{MonitorConfig, PoolConfig, ServerConfig};

/// Pool config with the given limits and no idle expiry.
pub fn pool(max_connections: usize, max_idle_connections: usize) -> PoolConfig {
    PoolConfig::new(max_connections, max_idle_connections)
}

/// Monitor probing every 20ms, immediate checks at most every 5ms.
pub fn monitor() -> MonitorConfig {
    MonitorConfig {
        heartbeat_interval_ms: 20,
        min_heartbeat_interval_ms: 5,
    }
}

/// Server config with the given pool limits and a fast monitor.
pub fn server(max_connections: usize, max_idle_connections: usize) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.pool = pool(max_connections, max_idle_connections);
    config.monitor = monitor();
    config.connection.connect_timeout_ms = 1_000;
    config
}

/// Server config whose monitor effectively never fires on its own.
///
/// For tests that drive the pool through the server and must not see
/// monitor-initiated drains or dials.
pub fn quiet_server(max_connections: usize, max_idle_connections: usize) -> ServerConfig {
    let mut config = server(max_connections, max_idle_connections);
    config.monitor.heartbeat_interval_ms = 3_600_000;
    config
}
