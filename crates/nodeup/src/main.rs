//! nodeup - interactive single-node platform installer.

use anyhow::{Context, Result};
use clap::Parser;
use nodeup::{logging, system, tui};
use nodeup_shared::config::{InstallerConfig, DEFAULT_CONFIG_PATH};
use std::path::PathBuf;
use tracing::info;

const VERSION: &str = env!("NODEUP_VERSION");

#[derive(Parser)]
#[command(name = "nodeup")]
#[command(about = "Install a single-node platform: cluster runtime, DNS, registry and deployment")]
#[command(version = VERSION)]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log file (falls back to /tmp when not writable)
    #[arg(long, default_value = logging::DEFAULT_LOG_PATH)]
    log_file: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_path = logging::init(&cli.log_file).context("failed to set up logging")?;
    info!("nodeup v{} starting, logging to {}", VERSION, log_path.display());

    let config = InstallerConfig::load(&cli.config);
    let collaborators = system::collaborators(&config).context("failed to set up collaborators")?;

    tui::run(config, collaborators)
        .await
        .context("installer terminal session failed")?;

    // The TUI has left the alternate screen; tell the user where the details are.
    println!("nodeup log: {}", log_path.display());
    Ok(())
}
