//! Trait definitions for the external collaborators this crate drives.
//!
//! The network dial, the handshake and the status probe are supplied by the
//! driver embedding the pool; this crate only sequences them.

pub mod probe;
pub mod transport;

pub use probe::{ProbeReply, Prober};
pub use transport::{BoxTransport, Dialer, Handshaker, Transport};
