//! Infrastructure layer.
//!
//! The moving parts behind [`Server`](crate::Server): connection
//! establishment, pooling, monitoring and fan-out.
//!
//! # Submodules
//!
//! - [`classify`] - Transient vs persistent failure classification
//! - [`config`] - Configuration loading and validation
//! - [`net`] - TCP dialer and ping prober
//! - [`pool`] - Bounded per-server connection pool
//! - [`subscription`] - Latest-wins description broadcaster

pub mod classify;
pub mod config;
pub(crate) mod connect;
pub(crate) mod monitor;
pub mod net;
pub mod pool;
pub mod subscription;
