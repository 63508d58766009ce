//! Checked-out connection guard.
//!
//! A [`PooledConnection`] owns its connection and the admission permit that
//! counts it against `max_connections`. Releasing or dropping the guard checks
//! the connection back in before the permit is released, so a woken waiter
//! finds the connection already on the idle list.

use std::io;
use std::pin::Pin;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::task::{ready, Context, Poll};
use std::time::Instant;

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::sync::OwnedSemaphorePermit;
use tracing::warn;

use super::state::{Connection, ConnectionState};
use super::Shared;
use crate::domain::{ConnectionId, FailureClass};

pub struct PooledConnection {
    conn: Option<Connection>,
    permit: Option<OwnedSemaphorePermit>,
    shared: Arc<Shared>,
}

impl PooledConnection {
    pub(super) fn new(mut conn: Connection, permit: OwnedSemaphorePermit, shared: Arc<Shared>) -> Self {
        conn.mark_checked_out();
        shared.counters.checked_out.fetch_add(1, Ordering::Relaxed);
        Self {
            conn: Some(conn),
            permit: Some(permit),
            shared,
        }
    }

    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.conn.as_ref().map_or(ConnectionId::new(0), |c| c.id)
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.conn.as_ref().map_or(ConnectionState::Closed, |c| c.state)
    }

    /// Pool generation this connection was created in.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.conn.as_ref().map_or(0, |c| c.generation)
    }

    #[must_use]
    pub fn created_at(&self) -> Option<Instant> {
        self.conn.as_ref().map(|c| c.created_at)
    }

    /// True if the pool has been drained since this connection was created.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.shared.current_generation() != self.generation()
    }

    /// True once a persistent I/O error was observed on this connection.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.conn.as_ref().is_some_and(|c| c.failed)
    }

    /// Return the connection to the pool.
    ///
    /// Equivalent to dropping the guard.
    pub fn release(self) {}

    /// Close the connection instead of returning it to the idle list.
    pub fn discard(mut self) {
        if let Some(conn) = self.conn.as_mut() {
            conn.failed = true;
        }
    }

    fn observe(&mut self, err: &io::Error) {
        let Some(conn) = self.conn.as_mut() else {
            return;
        };
        if conn.failed || self.shared.classifier.classify_io(err) != FailureClass::Persistent {
            return;
        }
        conn.failed = true;
        warn!(
            address = %self.shared.address,
            connection_id = %conn.id,
            generation = conn.generation,
            error = %err,
            "Network error on pooled connection"
        );
        self.shared.drain_generation(conn.generation);
    }

    fn released() -> io::Error {
        io::Error::new(io::ErrorKind::NotConnected, "connection already released")
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.shared.counters.checked_out.fetch_sub(1, Ordering::Relaxed);
            self.shared.check_in(conn);
        }
        drop(self.permit.take());
    }
}

impl std::fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection")
            .field("id", &self.id())
            .field("generation", &self.generation())
            .field("address", &self.shared.address)
            .finish_non_exhaustive()
    }
}

impl AsyncRead for PooledConnection {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let Some(conn) = this.conn.as_mut() else {
            return Poll::Ready(Err(Self::released()));
        };
        let result = ready!(Pin::new(&mut conn.transport).poll_read(cx, buf));
        if let Err(err) = &result {
            this.observe(err);
        }
        Poll::Ready(result)
    }
}

impl AsyncWrite for PooledConnection {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let Some(conn) = this.conn.as_mut() else {
            return Poll::Ready(Err(Self::released()));
        };
        let result = ready!(Pin::new(&mut conn.transport).poll_write(cx, buf));
        if let Err(err) = &result {
            this.observe(err);
        }
        Poll::Ready(result)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let Some(conn) = this.conn.as_mut() else {
            return Poll::Ready(Err(Self::released()));
        };
        let result = ready!(Pin::new(&mut conn.transport).poll_flush(cx));
        if let Err(err) = &result {
            this.observe(err);
        }
        Poll::Ready(result)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let Some(conn) = this.conn.as_mut() else {
            return Poll::Ready(Err(Self::released()));
        };
        // A shut-down transport cannot be reused.
        conn.failed = true;
        Pin::new(&mut conn.transport).poll_shutdown(cx)
    }
}
