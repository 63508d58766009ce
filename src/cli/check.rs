//! Handler for the `check` command.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context as _;

use crate::cli::watch::format_description;
use crate::cli::{resolve_address, CheckArgs};
use crate::context::Context;
use crate::domain::ServerKind;
use crate::infrastructure::config::Config;
use crate::infrastructure::net::{PingProber, TcpDialer};
use crate::server::Server;

/// Wait for the first probe result, check out one connection, report both.
///
/// # Errors
///
/// Returns an error if the probe fails, the connection cannot be checked
/// out in time, or the address is missing.
pub async fn execute(args: &CheckArgs, config: Config) -> anyhow::Result<()> {
    let address = resolve_address(args.address.as_deref(), &config)?;
    let limit = Duration::from_millis(args.timeout_ms);
    println!("Checking server: {address}");
    println!();

    let server = Server::new(
        address,
        config.server,
        Arc::new(TcpDialer),
        Arc::new(PingProber),
    )?;
    let result = run_checks(&server, limit).await;
    server.close().await?;
    result
}

async fn run_checks(server: &Server, limit: Duration) -> anyhow::Result<()> {
    let mut sub = server.subscribe()?;

    let desc = tokio::time::timeout(limit, async {
        while let Some(desc) = sub.recv().await {
            if desc.kind != ServerKind::Unknown || desc.last_error.is_some() {
                return Some(desc);
            }
        }
        None
    })
    .await
    .context("timed out waiting for the first probe")?
    .context("server closed before the first probe")?;

    println!("{}", format_description(&desc));
    if let Some(error) = &desc.last_error {
        anyhow::bail!("probe failed: {error}");
    }
    println!("✓ Probe succeeded");

    let started = Instant::now();
    let conn = server
        .connection(&Context::with_timeout(limit))
        .await
        .context("connection checkout failed")?;
    println!(
        "✓ Checked out connection {} in {:.2}ms",
        conn.id(),
        started.elapsed().as_secs_f64() * 1_000.0
    );
    drop(conn);

    let stats = server.pool_stats();
    println!();
    println!("Pool:");
    println!("  Live: {}/{}", stats.live(), stats.max_connections);
    println!("  Created: {}", stats.total_created);
    Ok(())
}
