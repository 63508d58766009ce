//! Point-in-time snapshots of a single server's observed state.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::address::Address;

/// Role a server reported for itself on its last successful probe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerKind {
    /// Not yet probed, or the last probe failed.
    #[default]
    Unknown,
    /// A single server outside any replicated set.
    Standalone,
    /// Writable member of a replicated set.
    Primary,
    /// Read-only member of a replicated set.
    Secondary,
    /// Voting member that holds no data.
    Arbiter,
    /// Query router in front of a sharded cluster.
    Router,
}

impl ServerKind {
    /// True if the server can serve operations at all.
    #[must_use]
    pub const fn is_available(self) -> bool {
        !matches!(self, Self::Unknown | Self::Arbiter)
    }
}

impl fmt::Display for ServerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unknown => "unknown",
            Self::Standalone => "standalone",
            Self::Primary => "primary",
            Self::Secondary => "secondary",
            Self::Arbiter => "arbiter",
            Self::Router => "router",
        };
        f.write_str(name)
    }
}

/// How a connectivity failure is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// Recorded only; pooled connections stay usable.
    Transient,
    /// The server is unreachable; pooled connections are drained.
    Persistent,
}

/// Failure recorded in a description, rendered once when it was observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerError {
    pub class: FailureClass,
    pub message: String,
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let class = match self.class {
            FailureClass::Transient => "transient",
            FailureClass::Persistent => "persistent",
        };
        write!(f, "{class}: {}", self.message)
    }
}

/// Immutable snapshot of one server's health and role.
///
/// Produced by the monitor; consumers only ever read it. Every new value
/// supersedes the previous one, so subscribers that fall behind lose nothing
/// by skipping straight to the latest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerDescription {
    pub address: Address,
    pub kind: ServerKind,
    /// Round trip of the most recent successful probe.
    pub last_rtt: Option<Duration>,
    /// Exponentially weighted average of successful probe round trips.
    pub average_rtt: Option<Duration>,
    pub last_error: Option<ServerError>,
    pub observed_at: DateTime<Utc>,
}

impl ServerDescription {
    /// Description of a server that has not been probed yet.
    #[must_use]
    pub fn unknown(address: Address) -> Self {
        Self {
            address,
            kind: ServerKind::Unknown,
            last_rtt: None,
            average_rtt: None,
            last_error: None,
            observed_at: Utc::now(),
        }
    }

    /// Description after a successful probe.
    #[must_use]
    pub fn observed(address: Address, kind: ServerKind, rtt: Duration, average: Duration) -> Self {
        Self {
            address,
            kind,
            last_rtt: Some(rtt),
            average_rtt: Some(average),
            last_error: None,
            observed_at: Utc::now(),
        }
    }

    /// Description after a failed probe.
    ///
    /// The server becomes [`ServerKind::Unknown`]; the average round trip is
    /// carried over so a single failure does not erase latency history.
    #[must_use]
    pub fn failed(address: Address, error: ServerError, average_rtt: Option<Duration>) -> Self {
        Self {
            address,
            kind: ServerKind::Unknown,
            last_rtt: None,
            average_rtt,
            last_error: Some(error),
            observed_at: Utc::now(),
        }
    }
}
