//! Connection pool internal state types.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize};
use std::time::Instant;

use crate::domain::ConnectionId;
use crate::port::BoxTransport;

/// Lifecycle of a single connection as seen by the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    CheckedOut,
    Closed,
}

/// A live connection and its pool bookkeeping.
pub(crate) struct Connection {
    pub(super) id: ConnectionId,
    /// Pool generation at creation; a mismatch marks the connection stale.
    pub(super) generation: u64,
    pub(super) transport: BoxTransport,
    pub(super) state: ConnectionState,
    pub(super) created_at: Instant,
    pub(super) idle_since: Option<Instant>,
    /// Set once a persistent I/O error was seen; never reused afterwards.
    pub(super) failed: bool,
}

impl Connection {
    pub(super) fn new(id: ConnectionId, generation: u64, transport: BoxTransport) -> Self {
        Self {
            id,
            generation,
            transport,
            state: ConnectionState::CheckedOut,
            created_at: Instant::now(),
            idle_since: None,
            failed: false,
        }
    }

    pub(super) fn mark_idle(&mut self) {
        self.state = ConnectionState::Idle;
        self.idle_since = Some(Instant::now());
    }

    pub(super) fn mark_checked_out(&mut self) {
        self.state = ConnectionState::CheckedOut;
        self.idle_since = None;
    }
}

/// Mutable pool state, only touched under the pool lock.
pub(super) struct PoolState {
    /// Idle connections; the most recently returned sits at the back.
    pub(super) idle: VecDeque<Connection>,
    pub(super) generation: u64,
    pub(super) closed: bool,
}

impl PoolState {
    pub(super) fn new() -> Self {
        Self {
            idle: VecDeque::new(),
            generation: 0,
            closed: false,
        }
    }
}

/// Shared counters updated without taking the pool lock.
pub(super) struct SharedCounters {
    pub(super) checked_out: AtomicUsize,
    pub(super) created: AtomicU64,
    pub(super) closed: AtomicU64,
    pub(super) drains: AtomicU64,
}

impl SharedCounters {
    pub(super) fn new() -> Self {
        Self {
            checked_out: AtomicUsize::new(0),
            created: AtomicU64::new(0),
            closed: AtomicU64::new(0),
            drains: AtomicU64::new(0),
        }
    }
}

/// Point-in-time pool statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub max_connections: usize,
    pub idle: usize,
    pub checked_out: usize,
    pub generation: u64,
    pub total_created: u64,
    pub total_closed: u64,
    pub drains: u64,
    pub closed: bool,
}

impl PoolStats {
    /// Connections currently alive (idle plus checked out).
    #[must_use]
    pub const fn live(&self) -> usize {
        self.idle + self.checked_out
    }
}
