//! Bounded connection pool for a single server.
//!
//! # Architecture
//!
//! Admission is a [`Semaphore`] with `max_connections` permits. Every
//! checked-out connection (and every in-flight dial) holds one permit; idle
//! connections hold none. A new connection is dialed only when the idle list
//! is empty at checkout, so idle plus checked-out connections never exceed
//! `max_connections`.
//!
//! The idle list, the generation counter and the closed flag live behind one
//! short `parking_lot` lock that is never held across an await.
//!
//! - **Drain** bumps the generation and closes idle connections. Checked-out
//!   connections from older generations are closed when they come back.
//! - **Close** sets the closed flag, closes idle connections and closes the
//!   semaphore, which fails every waiting and future checkout with
//!   [`Error::PoolClosed`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::context::Context;
use crate::domain::{Address, ConnectionId};
use crate::error::{Error, Result};
use crate::infrastructure::classify::FailureClassifier;
use crate::infrastructure::config::{ConnectionOptions, PoolConfig};
use crate::infrastructure::connect::establish;
use crate::port::Dialer;

mod connection;
mod state;

pub use connection::PooledConnection;
pub use state::{ConnectionState, PoolStats};

use state::{Connection, PoolState, SharedCounters};

/// Cheaply cloneable handle to one server's connection pool.
#[derive(Clone)]
pub struct ConnectionPool {
    shared: Arc<Shared>,
}

pub(crate) struct Shared {
    address: Address,
    config: PoolConfig,
    options: ConnectionOptions,
    dialer: Arc<dyn Dialer>,
    classifier: Arc<dyn FailureClassifier>,
    permits: Arc<Semaphore>,
    state: Mutex<PoolState>,
    counters: SharedCounters,
    next_id: AtomicU64,
}

impl ConnectionPool {
    /// Create an empty pool. No connection is opened until the first checkout.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` fails validation.
    pub fn new(
        address: Address,
        config: PoolConfig,
        options: ConnectionOptions,
        dialer: Arc<dyn Dialer>,
        classifier: Arc<dyn FailureClassifier>,
    ) -> Result<Self> {
        config.validate()?;
        options.validate()?;

        Ok(Self {
            shared: Arc::new(Shared {
                permits: Arc::new(Semaphore::new(config.max_connections)),
                address,
                config,
                options,
                dialer,
                classifier,
                state: Mutex::new(PoolState::new()),
                counters: SharedCounters::new(),
                next_id: AtomicU64::new(0),
            }),
        })
    }

    #[must_use]
    pub fn address(&self) -> &Address {
        &self.shared.address
    }

    /// Check out a connection.
    ///
    /// Reuses an idle connection when one is available, dials a new one when
    /// below `max_connections`, and otherwise waits for a release, for the
    /// pool to close, or for `ctx` to end.
    ///
    /// # Errors
    ///
    /// - [`Error::PoolClosed`] if the pool is closed at call time or while
    ///   waiting.
    /// - [`Error::DeadlineExceeded`] / [`Error::Cancelled`] if `ctx` ends
    ///   first.
    /// - Dial or handshake errors for a new connection.
    pub async fn get(&self, ctx: &Context) -> Result<PooledConnection> {
        if self.is_closed() {
            return Err(Error::PoolClosed);
        }

        let permit = ctx
            .run(Arc::clone(&self.shared.permits).acquire_owned())
            .await?
            .map_err(|_| Error::PoolClosed)?;

        if let Some(conn) = self.shared.take_idle()? {
            debug!(
                address = %self.shared.address,
                connection_id = %conn.id,
                "Reusing idle connection"
            );
            return Ok(PooledConnection::new(conn, permit, Arc::clone(&self.shared)));
        }

        let generation = self.generation();
        let transport = ctx
            .run(establish(
                self.shared.dialer.as_ref(),
                &self.shared.address,
                &self.shared.options,
            ))
            .await??;

        let id = ConnectionId::new(self.shared.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let conn = Connection::new(id, generation, transport);
        self.shared.counters.created.fetch_add(1, Ordering::Relaxed);

        if self.is_closed() {
            self.shared.close_connection(conn, "pool closed during dial");
            return Err(Error::PoolClosed);
        }

        debug!(
            address = %self.shared.address,
            connection_id = %id,
            generation,
            "Opened connection"
        );
        Ok(PooledConnection::new(conn, permit, Arc::clone(&self.shared)))
    }

    /// Invalidate every current connection without closing the pool.
    ///
    /// Idle connections are closed now; checked-out ones are closed when they
    /// are returned. Returns the new generation.
    pub fn drain(&self) -> u64 {
        self.shared.drain()
    }

    /// Close the pool.
    ///
    /// Idle connections are closed, waiting and future checkouts fail with
    /// [`Error::PoolClosed`], and checked-out connections are closed as they
    /// come back. Calling it again is a no-op.
    ///
    /// # Errors
    ///
    /// Currently infallible; the `Result` leaves room for transports whose
    /// close can fail.
    pub fn close(&self) -> Result<()> {
        let idle = {
            let mut state = self.shared.state.lock();
            if state.closed {
                return Ok(());
            }
            state.closed = true;
            std::mem::take(&mut state.idle)
        };
        self.shared.permits.close();

        let closed_idle = idle.len();
        for conn in idle {
            self.shared.close_connection(conn, "pool closed");
        }
        info!(
            address = %self.shared.address,
            closed_idle,
            checked_out = self.shared.counters.checked_out.load(Ordering::Relaxed),
            "Connection pool closed"
        );
        Ok(())
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.shared.current_generation()
    }

    /// Runtime statistics for observability.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let (idle, generation, closed) = {
            let state = self.shared.state.lock();
            (state.idle.len(), state.generation, state.closed)
        };
        let counters = &self.shared.counters;
        PoolStats {
            max_connections: self.shared.config.max_connections,
            idle,
            checked_out: counters.checked_out.load(Ordering::Relaxed),
            generation,
            total_created: counters.created.load(Ordering::Relaxed),
            total_closed: counters.closed.load(Ordering::Relaxed),
            drains: counters.drains.load(Ordering::Relaxed),
            closed,
        }
    }
}

impl Shared {
    fn current_generation(&self) -> u64 {
        self.state.lock().generation
    }

    /// Pop a reusable idle connection, closing stale or expired ones on the way.
    fn take_idle(&self) -> Result<Option<Connection>> {
        let max_idle_time = self.config.max_idle_time();
        let mut discarded = Vec::new();

        let found = {
            let mut state = self.state.lock();
            if state.closed {
                return Err(Error::PoolClosed);
            }
            let mut found = None;
            while let Some(conn) = state.idle.pop_back() {
                let expired = match (max_idle_time, conn.idle_since) {
                    (Some(limit), Some(since)) => since.elapsed() >= limit,
                    _ => false,
                };
                if conn.generation != state.generation || expired {
                    discarded.push(conn);
                } else {
                    found = Some(conn);
                    break;
                }
            }
            found
        };

        for conn in discarded {
            self.close_connection(conn, "stale or expired");
        }
        Ok(found)
    }

    /// Take back a connection from a caller.
    fn check_in(&self, mut conn: Connection) {
        let reason = {
            let mut state = self.state.lock();
            let reason = if state.closed {
                Some("pool closed")
            } else if conn.failed {
                Some("network error")
            } else if conn.generation != state.generation {
                Some("stale generation")
            } else if state.idle.len() >= self.config.idle_capacity() {
                Some("idle list full")
            } else {
                None
            };
            match reason {
                Some(reason) => reason,
                None => {
                    conn.mark_idle();
                    state.idle.push_back(conn);
                    return;
                }
            }
        };
        self.close_connection(conn, reason);
    }

    fn drain(&self) -> u64 {
        self.drain_matching(None)
    }

    /// Drain only if `generation` is still current, so a burst of errors from
    /// one epoch drains once.
    fn drain_generation(&self, generation: u64) {
        self.drain_matching(Some(generation));
    }

    fn drain_matching(&self, expected: Option<u64>) -> u64 {
        let (generation, idle) = {
            let mut state = self.state.lock();
            if state.closed || expected.is_some_and(|g| g != state.generation) {
                return state.generation;
            }
            state.generation += 1;
            (state.generation, std::mem::take(&mut state.idle))
        };
        self.counters.drains.fetch_add(1, Ordering::Relaxed);

        let closed_idle = idle.len();
        for conn in idle {
            self.close_connection(conn, "pool drained");
        }
        info!(
            address = %self.address,
            generation,
            closed_idle,
            "Connection pool drained"
        );
        generation
    }

    fn close_connection(&self, mut conn: Connection, reason: &'static str) {
        conn.state = ConnectionState::Closed;
        self.counters.closed.fetch_add(1, Ordering::Relaxed);
        debug!(
            address = %self.address,
            connection_id = %conn.id,
            generation = conn.generation,
            age_ms = u64::try_from(conn.created_at.elapsed().as_millis()).unwrap_or(u64::MAX),
            reason,
            "Closing connection"
        );
        drop(conn);
    }
}
