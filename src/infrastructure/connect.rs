//! Connection establishment shared by the pool and the monitor.

use tokio::time::timeout;
use tracing::debug;

use crate::domain::Address;
use crate::error::{Error, Result};
use crate::infrastructure::config::ConnectionOptions;
use crate::port::{BoxTransport, Dialer};

/// Dial `address` and run the configured handshake, each bounded by the
/// connect timeout.
pub(crate) async fn establish(
    dialer: &dyn Dialer,
    address: &Address,
    options: &ConnectionOptions,
) -> Result<BoxTransport> {
    let limit = options.connect_timeout();
    let timed_out = || Error::ConnectTimeout {
        address: address.to_string(),
    };

    let mut transport = timeout(limit, dialer.dial(address, options))
        .await
        .map_err(|_| timed_out())??;

    if let Some(handshaker) = &options.handshaker {
        timeout(limit, handshaker.handshake(&mut transport, address))
            .await
            .map_err(|_| timed_out())??;
        debug!(address = %address, "Handshake complete");
    }

    Ok(transport)
}
