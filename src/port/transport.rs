//! Connection-establishment ports: the byte stream, the dialer that opens it
//! and the handshaker that authenticates it.

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::domain::Address;
use crate::error::Result;
use crate::infrastructure::config::ConnectionOptions;

/// A bidirectional byte stream to one server.
///
/// Blanket-implemented for every async stream, so `TcpStream`, TLS streams and
/// in-memory duplex pipes all qualify. Closing a transport means dropping it.
pub trait Transport: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

impl<T> Transport for T where T: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

/// Owned, type-erased transport as handed out by a [`Dialer`].
pub type BoxTransport = Box<dyn Transport>;

/// Opens raw transports to a server.
///
/// Implementations own the network specifics (TCP, TLS, proxies). The pool
/// and the monitor wrap every call in the configured connect timeout.
#[async_trait]
pub trait Dialer: Send + Sync {
    /// Open a transport to `address`.
    async fn dial(&self, address: &Address, options: &ConnectionOptions) -> Result<BoxTransport>;
}

/// Runs the connection handshake (for example authentication) on a freshly
/// dialed transport before it is pooled or probed.
#[async_trait]
pub trait Handshaker: Send + Sync {
    async fn handshake(&self, transport: &mut BoxTransport, address: &Address) -> Result<()>;
}
