use anyhow::Result;
use canledger::application::AppError;
use canledger::cli::Cli;
use clap::Parser;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = cli.run().await;
    if let Err(e) = &result {
        match e.downcast_ref::<AppError>() {
            Some(app) if app.is_client_error() => warn!(error = %app, "command rejected"),
            _ => error!(error = %e, "command failed"),
        }
    }
    result
}

/// Log to stderr. `CANLEDGER_LOG` takes precedence over `--verbose`.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("CANLEDGER_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
