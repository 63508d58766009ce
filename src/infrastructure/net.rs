//! TCP implementations of the dialer and prober ports.
//!
//! [`TcpDialer`] opens plain TCP streams. [`PingProber`] checks that the
//! server has not hung up on the monitor's stream and times a fresh TCP
//! connect as the round trip. It knows nothing about the wire protocol, so it
//! always reports [`ServerKind::Standalone`]. Drivers plug in their own prober
//! to learn the real server role.

use std::io;

use async_trait::async_trait;
use futures_util::FutureExt;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;

use crate::domain::{Address, ServerKind};
use crate::error::{ConfigError, Error, Result};
use crate::infrastructure::config::ConnectionOptions;
use crate::port::{BoxTransport, Dialer, ProbeReply, Prober};

#[derive(Debug, Clone, Copy, Default)]
pub struct TcpDialer;

#[async_trait]
impl Dialer for TcpDialer {
    async fn dial(&self, address: &Address, options: &ConnectionOptions) -> Result<BoxTransport> {
        if options.tls.is_some() {
            return Err(ConfigError::InvalidValue {
                field: "connection.tls",
                reason: "TcpDialer opens plain TCP; supply a TLS-capable dialer".into(),
            }
            .into());
        }

        let stream = TcpStream::connect((socket_host(address), address.port())).await?;
        stream.set_nodelay(true)?;
        Ok(Box::new(stream))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PingProber;

#[async_trait]
impl Prober for PingProber {
    async fn probe(&self, transport: &mut BoxTransport, address: &Address) -> Result<ProbeReply> {
        // The server never speaks first, so a ready read means EOF, a reset
        // or a protocol violation.
        let mut buf = [0u8; 1];
        match transport.read(&mut buf).now_or_never() {
            None => {}
            Some(Ok(0)) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "server closed the monitoring connection",
                )
                .into())
            }
            Some(Ok(_)) => {
                return Err(Error::Probe(
                    "unexpected data on idle monitoring connection".into(),
                ))
            }
            Some(Err(e)) => return Err(e.into()),
        }

        TcpStream::connect((socket_host(address), address.port())).await?;
        Ok(ProbeReply::new(ServerKind::Standalone))
    }
}

/// Host in the form `TcpStream::connect` accepts (IPv6 without brackets).
fn socket_host(address: &Address) -> &str {
    address.host().trim_start_matches('[').trim_end_matches(']')
}
