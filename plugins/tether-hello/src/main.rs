use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tether_core::{ConfigLoader, RuntimeContext, init_logging, serve};
use tether_hello::{HelloPlugin, install, open_storage};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "tether-hello", about = "Hello plugin served over stdin/stdout")]
#[command(version)]
struct Cli {
    /// Config file layered over the user and project config
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::load(cli.config.as_deref()).context("loading configuration")?;
    init_logging(&config.logging, cli.verbose)?;

    let storage = open_storage(&config.storage)
        .await
        .context("opening plugin storage")?;
    let context = RuntimeContext::new(config);
    install(&context, Arc::new(HelloPlugin::new(storage)))?;

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl-C, shutting down");
                signal_token.cancel();
            }
            Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C"),
        }
    });

    let result = serve(&context, shutdown).await;
    context.shutdown();
    result?;
    Ok(())
}
