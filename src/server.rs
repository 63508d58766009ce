//! Per-server facade composing the pool, the monitor and the broadcaster.
//!
//! A [`Server`] starts operating as soon as it is built: the monitor task is
//! spawned, the pool accepts checkouts and the broadcaster accepts
//! subscriptions. [`Server::close`] moves it to the closed state exactly once,
//! tearing the parts down in this order:
//!
//! 1. cancel the monitor, so nothing publishes or drains afterwards;
//! 2. shut down the broadcaster, closing every subscription;
//! 3. close the pool, failing waiting and future checkouts;
//! 4. wait for the monitor task to exit.
//!
//! Steps 1 to 3 run before the first await, so dropping a `close` future
//! early still leaves the server fully closed. Calls racing with `close`
//! either complete normally or get the closed-state error. None of them hang.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::context::Context;
use crate::domain::{Address, ServerDescription};
use crate::error::{Error, Result};
use crate::infrastructure::config::ServerConfig;
use crate::infrastructure::monitor::{MonitorContext, MonitorHandle};
use crate::infrastructure::pool::{ConnectionPool, PoolStats, PooledConnection};
use crate::infrastructure::subscription::{Broadcaster, Subscription};
use crate::port::{Dialer, Prober};

/// Cheaply cloneable handle to one monitored, pooled server.
///
/// Clones share the same pool, monitor and broadcaster. Dropping the last
/// handle without calling [`close`](Self::close) still cancels the monitor
/// and closes every subscription and the pool.
#[derive(Clone)]
pub struct Server {
    inner: Arc<Inner>,
}

struct Inner {
    address: Address,
    pool: ConnectionPool,
    broadcaster: Broadcaster,
    monitor: Mutex<Option<MonitorHandle>>,
    closed: AtomicBool,
}

impl Server {
    /// Build a server and start monitoring it.
    ///
    /// Must be called inside a tokio runtime. No pooled connection is opened
    /// until the first [`connection`](Self::connection) call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `config` fails validation.
    pub fn new(
        address: Address,
        config: ServerConfig,
        dialer: Arc<dyn Dialer>,
        prober: Arc<dyn Prober>,
    ) -> Result<Self> {
        config.validate()?;

        let pool = ConnectionPool::new(
            address.clone(),
            config.pool.clone(),
            config.connection.clone(),
            Arc::clone(&dialer),
            Arc::clone(&config.classifier),
        )?;
        let broadcaster = Broadcaster::new(ServerDescription::unknown(address.clone()));

        let monitor = MonitorHandle::spawn(MonitorContext {
            address: address.clone(),
            config: config.monitor.clone(),
            options: config.connection.clone(),
            dialer,
            prober,
            classifier: Arc::clone(&config.classifier),
            pool: pool.clone(),
            broadcaster: broadcaster.clone(),
        });

        info!(
            address = %address,
            max_connections = config.pool.max_connections,
            max_idle_connections = config.pool.max_idle_connections,
            heartbeat_ms = config.monitor.heartbeat_interval_ms,
            "Server started"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                address,
                pool,
                broadcaster,
                monitor: Mutex::new(Some(monitor)),
                closed: AtomicBool::new(false),
            }),
        })
    }

    #[must_use]
    pub fn address(&self) -> &Address {
        &self.inner.address
    }

    /// Check out a pooled connection, waiting at most as long as `ctx` allows.
    ///
    /// The connection returns to the pool when dropped.
    ///
    /// # Errors
    ///
    /// - [`Error::PoolClosed`] once the server is closed, without touching
    ///   the pool.
    /// - [`Error::DeadlineExceeded`] / [`Error::Cancelled`] if `ctx` ends
    ///   while waiting for capacity.
    /// - Dial or handshake errors for a new connection.
    pub async fn connection(&self, ctx: &Context) -> Result<PooledConnection> {
        if self.is_closed() {
            return Err(Error::PoolClosed);
        }
        self.inner.pool.get(ctx).await
    }

    /// Subscribe to the server's descriptions.
    ///
    /// The current description is delivered immediately.
    ///
    /// # Errors
    ///
    /// [`Error::SubscribeAfterClosed`] once the server is closed.
    pub fn subscribe(&self) -> Result<Subscription> {
        if self.is_closed() {
            return Err(Error::SubscribeAfterClosed);
        }
        self.inner.broadcaster.subscribe()
    }

    /// The most recently published description.
    #[must_use]
    pub fn description(&self) -> ServerDescription {
        self.inner.broadcaster.latest()
    }

    /// Invalidate every pooled connection without closing the server.
    ///
    /// Returns the pool's new generation.
    pub fn drain(&self) -> u64 {
        self.inner.pool.drain()
    }

    /// Ask the monitor to probe now instead of waiting for the next
    /// heartbeat. Probes stay at least the minimum heartbeat interval apart.
    /// No-op once closed.
    pub fn request_immediate_check(&self) {
        if let Some(monitor) = self.inner.monitor.lock().as_ref() {
            monitor.request_check();
        }
    }

    #[must_use]
    pub fn pool_stats(&self) -> PoolStats {
        self.inner.pool.stats()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Close the server.
    ///
    /// Cancels the monitor, closes every subscription and closes the pool,
    /// then waits for the monitor task to exit. Connections still checked
    /// out are closed as they are dropped. A second call returns `Ok(())`
    /// immediately.
    ///
    /// Everything except the final wait happens on the first poll, so the
    /// server is closed even if the returned future is dropped early.
    ///
    /// # Errors
    ///
    /// Propagates a failure to close the pool.
    pub async fn close(&self) -> Result<()> {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            debug!(address = %self.inner.address, "Server already closed");
            return Ok(());
        }

        let monitor = self.inner.monitor.lock().take();
        if let Some(monitor) = &monitor {
            monitor.cancel();
        }
        self.inner.broadcaster.shutdown();
        let closed = self.inner.pool.close();
        info!(address = %self.inner.address, "Server closed");

        if let Some(monitor) = monitor {
            monitor.stop().await;
        }
        closed
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        // Dropping the handle cancels the task without waiting.
        drop(self.monitor.get_mut().take());
        self.broadcaster.shutdown();
        if let Err(e) = self.pool.close() {
            debug!(address = %self.address, error = %e, "Pool close on drop failed");
        }
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("address", &self.inner.address)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
