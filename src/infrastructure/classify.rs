//! Transient versus persistent classification of connectivity failures.
//!
//! The boundary decides when pooled connections are drained. It is a trait so
//! drivers can tighten or loosen it; [`DefaultClassifier`] treats timeouts as
//! transient and resets, refusals and dead sockets as persistent.

use std::io;

use crate::domain::FailureClass;
use crate::error::Error;

pub trait FailureClassifier: Send + Sync {
    /// Classify a raw I/O error seen on a transport.
    fn classify_io(&self, err: &io::Error) -> FailureClass;

    /// Classify any crate error seen while dialing, handshaking or probing.
    fn classify(&self, err: &Error) -> FailureClass {
        match err {
            Error::Io(e) => self.classify_io(e),
            _ => FailureClass::Transient,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultClassifier;

impl FailureClassifier for DefaultClassifier {
    fn classify_io(&self, err: &io::Error) -> FailureClass {
        use io::ErrorKind::{
            AddrNotAvailable, BrokenPipe, ConnectionAborted, ConnectionRefused, ConnectionReset,
            NotConnected, UnexpectedEof,
        };

        match err.kind() {
            ConnectionRefused | ConnectionReset | ConnectionAborted | NotConnected
            | BrokenPipe | UnexpectedEof | AddrNotAvailable => FailureClass::Persistent,
            _ => FailureClass::Transient,
        }
    }
}
