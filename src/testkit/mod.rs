//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`net`] - [`MockDialer`](net::MockDialer) over in-memory duplex pipes,
//!   failing transports and a recording handshaker.
//! - [`probe`] - [`ScriptedProber`](probe::ScriptedProber).
//! - [`config`] - Canonical fast test configurations.

pub mod config;
pub mod net;
pub mod probe;

use crate::domain::Address;

/// The address every test server pretends to live at.
pub fn address() -> Address {
    Address::parse("localhost:27017").unwrap_or_else(|e| panic!("test address: {e}"))
}
