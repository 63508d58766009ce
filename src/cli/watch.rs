//! Handler for the `watch` command.

use std::sync::Arc;

use tokio::signal;
use tracing::info;

use crate::cli::{resolve_address, WatchArgs};
use crate::domain::ServerDescription;
use crate::infrastructure::config::Config;
use crate::infrastructure::net::{PingProber, TcpDialer};
use crate::server::Server;

/// Subscribe to the server and print every description until interrupted
/// or `--count` descriptions were shown.
///
/// # Errors
///
/// Returns an error if the address is missing or the server cannot be built.
pub async fn execute(args: &WatchArgs, config: Config) -> anyhow::Result<()> {
    let address = resolve_address(args.address.as_deref(), &config)?;
    let server = Server::new(
        address,
        config.server,
        Arc::new(TcpDialer),
        Arc::new(PingProber),
    )?;
    let mut sub = server.subscribe()?;

    let mut seen = 0usize;
    loop {
        tokio::select! {
            desc = sub.recv() => {
                let Some(desc) = desc else { break };
                println!("{}", format_description(&desc));
                seen += 1;
                if args.count.is_some_and(|limit| seen >= limit) {
                    break;
                }
            }
            _ = signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    server.close().await?;
    Ok(())
}

/// One-line rendering of a description.
#[must_use]
pub fn format_description(desc: &ServerDescription) -> String {
    let rtt = |d: Option<std::time::Duration>| {
        d.map_or_else(|| "-".to_string(), |d| format!("{:.2}ms", d.as_secs_f64() * 1_000.0))
    };
    let mut line = format!(
        "{} {} {} rtt={} avg={}",
        desc.observed_at.format("%H:%M:%S%.3f"),
        desc.address,
        desc.kind,
        rtt(desc.last_rtt),
        rtt(desc.average_rtt),
    );
    if let Some(error) = &desc.last_error {
        line.push_str(&format!(" error=\"{error}\""));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::domain::{FailureClass, ServerError, ServerKind};
    use crate::testkit;

    #[test]
    fn formats_successful_probe() {
        let desc = ServerDescription::observed(
            testkit::address(),
            ServerKind::Primary,
            Duration::from_micros(1_500),
            Duration::from_millis(2),
        );
        let line = format_description(&desc);
        assert!(line.contains("localhost:27017 primary rtt=1.50ms avg=2.00ms"), "{line}");
        assert!(!line.contains("error="));
    }

    #[test]
    fn formats_failure_with_error() {
        let desc = ServerDescription::failed(
            testkit::address(),
            ServerError {
                class: FailureClass::Persistent,
                message: "connection refused".into(),
            },
            None,
        );
        let line = format_description(&desc);
        assert!(line.contains("unknown rtt=- avg=-"), "{line}");
        assert!(line.ends_with("error=\"persistent: connection refused\""), "{line}");
    }
}
