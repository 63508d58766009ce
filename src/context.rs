//! Caller-supplied deadline and cancellation for operations that may wait.
//!
//! Only connection checkout can wait for an unbounded time, so it is the only
//! operation that takes a [`Context`]. A context carries an optional deadline
//! and an optional [`CancellationToken`]; whichever fires first ends the wait
//! with [`Error::DeadlineExceeded`] or [`Error::Cancelled`].

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default)]
pub struct Context {
    deadline: Option<Instant>,
    cancel: Option<CancellationToken>,
}

impl Context {
    /// A context that never expires and cannot be cancelled.
    #[must_use]
    pub fn background() -> Self {
        Self::default()
    }

    /// A context that expires `timeout` from now.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::background().and_timeout(timeout)
    }

    #[must_use]
    pub fn with_deadline(deadline: Instant) -> Self {
        Self::background().and_deadline(deadline)
    }

    /// A context ended by cancelling `token`.
    #[must_use]
    pub fn with_cancellation(token: CancellationToken) -> Self {
        Self::background().and_cancellation(token)
    }

    /// Add a timeout; the earlier of this and any existing deadline wins.
    #[must_use]
    pub fn and_timeout(self, timeout: Duration) -> Self {
        self.and_deadline(Instant::now() + timeout)
    }

    #[must_use]
    pub fn and_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    #[must_use]
    pub fn and_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fail immediately if the context has already ended.
    ///
    /// # Errors
    ///
    /// [`Error::Cancelled`] if the token fired, [`Error::DeadlineExceeded`]
    /// if the deadline passed. Cancellation is reported first.
    pub fn check(&self) -> Result<()> {
        if self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
            return Err(Error::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(Error::DeadlineExceeded);
        }
        Ok(())
    }

    /// Drive `fut` until it completes or the context ends.
    ///
    /// If the future and the context end in the same poll, the future's
    /// output wins.
    ///
    /// # Errors
    ///
    /// Same as [`check`](Self::check), raised either up front or while
    /// waiting.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output> {
        self.check()?;

        let expired = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };
        let cancelled = async {
            match &self.cancel {
                Some(token) => token.cancelled().await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            out = fut => Ok(out),
            () = cancelled => Err(Error::Cancelled),
            () = expired => Err(Error::DeadlineExceeded),
        }
    }
}
