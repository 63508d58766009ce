//! Server probing port used by the monitor.

use async_trait::async_trait;

use crate::domain::{Address, ServerKind};
use crate::error::Result;
use crate::port::transport::BoxTransport;

/// What a successful probe learned about the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeReply {
    pub kind: ServerKind,
}

impl ProbeReply {
    #[must_use]
    pub const fn new(kind: ServerKind) -> Self {
        Self { kind }
    }
}

/// Performs one status round trip over the monitor's dedicated transport.
///
/// The monitor measures the wall time of `probe` as the server round trip, so
/// implementations should do exactly one request/response exchange.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, transport: &mut BoxTransport, address: &Address) -> Result<ProbeReply>;
}
