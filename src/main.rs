use clap::Parser;
use nodepool::cli::{self, Cli, Commands};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match cli.load_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {e:#}");
            std::process::exit(1);
        }
    };

    config.init_logging();
    info!("nodepool starting");

    let result = match &cli.command {
        Commands::Watch(args) => cli::watch::execute(args, config).await,
        Commands::Check(args) => cli::check::execute(args, config).await,
    };

    if let Err(e) = result {
        error!(error = %e, "Fatal error");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }

    info!("nodepool stopped");
}
