//! Command-line interface definitions.

pub mod check;
pub mod watch;

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use crate::domain::Address;
use crate::infrastructure::config::Config;

/// Nodepool - watch and check a single database server.
#[derive(Parser, Debug)]
#[command(name = "nodepool")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Use JSON log format instead of pretty
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Stream server descriptions until interrupted
    Watch(WatchArgs),

    /// Probe the server once and check out one connection
    Check(CheckArgs),
}

/// Arguments for the `watch` subcommand.
#[derive(Parser, Debug)]
pub struct WatchArgs {
    /// Server address (host[:port]); falls back to the config file
    pub address: Option<String>,

    /// Stop after this many descriptions
    #[arg(long)]
    pub count: Option<usize>,
}

/// Arguments for the `check` subcommand.
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Server address (host[:port]); falls back to the config file
    pub address: Option<String>,

    /// How long to wait for the probe and the connection (milliseconds)
    #[arg(long, default_value_t = 5_000)]
    pub timeout_ms: u64,
}

impl Cli {
    /// Load the config file if one was given, then apply command-line
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)
                .with_context(|| format!("failed to load {}", path.display()))?,
            None => Config::default(),
        };
        if let Some(level) = &self.log_level {
            config.logging.level.clone_from(level);
        }
        if self.json_logs {
            config.logging.format = "json".into();
        }
        Ok(config)
    }
}

/// Pick the address from the command line, else from the config file.
///
/// # Errors
///
/// Returns an error if neither names a valid address.
pub fn resolve_address(arg: Option<&str>, config: &Config) -> anyhow::Result<Address> {
    match (arg, &config.address) {
        (Some(raw), _) => Ok(Address::parse(raw)?),
        (None, Some(address)) => Ok(address.clone()),
        (None, None) => anyhow::bail!("no server address given on the command line or in the config"),
    }
}
