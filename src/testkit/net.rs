//! Mock dialer and transports.
//!
//! - [`MockDialer`] - Hands out in-memory duplex pipes; counts dials; can
//!   fail scripted dials, delay every dial, or hand out transports whose I/O
//!   always fails with a chosen error kind.
//! - [`FailingTransport`] - Every read and write fails with one error kind.
//! - [`RecordingHandshaker`] - Counts handshakes, optionally rejecting them.

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicU32, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{duplex, AsyncRead, AsyncWrite, DuplexStream, ReadBuf};

use crate::domain::Address;
use crate::error::{Error, Result};
use crate::infrastructure::config::ConnectionOptions;
use crate::port::{BoxTransport, Dialer, Handshaker};

// ---------------------------------------------------------------------------
// MockDialer
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockDialer {
    dials: AtomicU32,
    scripted_failures: Mutex<VecDeque<io::ErrorKind>>,
    io_failure: Mutex<Option<io::ErrorKind>>,
    delay: Mutex<Option<Duration>>,
    /// Server ends of handed-out pipes, kept alive so writes succeed.
    peers: Mutex<Vec<DuplexStream>>,
}

impl MockDialer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next dial fail with `kind`. Calls queue up.
    pub fn fail_next(&self, kind: io::ErrorKind) {
        self.scripted_failures.lock().push_back(kind);
    }

    /// Make every transport dialed from now on fail its I/O with `kind`.
    pub fn set_io_failure(&self, kind: Option<io::ErrorKind>) {
        *self.io_failure.lock() = kind;
    }

    /// Sleep for `delay` inside every dial.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock() = delay;
    }

    /// Total dial attempts, successful or not.
    pub fn dial_count(&self) -> u32 {
        self.dials.load(Ordering::SeqCst)
    }

    /// Drop the server ends of every pipe, so reads on live transports see
    /// EOF and writes fail with a broken pipe.
    pub fn hang_up_all(&self) {
        self.peers.lock().clear();
    }
}

#[async_trait]
impl Dialer for MockDialer {
    async fn dial(&self, _address: &Address, _options: &ConnectionOptions) -> Result<BoxTransport> {
        self.dials.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(kind) = self.scripted_failures.lock().pop_front() {
            return Err(io::Error::new(kind, "scripted dial failure").into());
        }
        if let Some(kind) = *self.io_failure.lock() {
            return Ok(Box::new(FailingTransport::new(kind)));
        }

        let (client, server) = duplex(4096);
        self.peers.lock().push(server);
        Ok(Box::new(client))
    }
}

// ---------------------------------------------------------------------------
// FailingTransport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct FailingTransport {
    kind: io::ErrorKind,
}

impl FailingTransport {
    pub fn new(kind: io::ErrorKind) -> Self {
        Self { kind }
    }

    fn error(&self) -> io::Error {
        io::Error::new(self.kind, "injected transport failure")
    }
}

impl AsyncRead for FailingTransport {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Poll::Ready(Err(self.error()))
    }
}

impl AsyncWrite for FailingTransport {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Poll::Ready(Err(self.error()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Err(self.error()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

// ---------------------------------------------------------------------------
// RecordingHandshaker
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingHandshaker {
    count: AtomicU32,
    reject: Mutex<Option<String>>,
}

impl RecordingHandshaker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every handshake from now on with `reason`.
    pub fn reject_with(&self, reason: impl Into<String>) {
        *self.reject.lock() = Some(reason.into());
    }

    pub fn count(&self) -> u32 {
        self.count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Handshaker for RecordingHandshaker {
    async fn handshake(&self, _transport: &mut BoxTransport, _address: &Address) -> Result<()> {
        self.count.fetch_add(1, Ordering::SeqCst);
        match self.reject.lock().clone() {
            Some(reason) => Err(Error::Handshake(reason)),
            None => Ok(()),
        }
    }
}
