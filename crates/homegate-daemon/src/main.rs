//! Homegate Daemon - Main entry point
//!
//! Enumerates the bridge's accessories into the registry and serves the
//! REST API and event stream.

mod api;
mod config;
mod server;
mod state;
mod ws;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "homegate")]
#[command(about = "HomeKit accessory gateway with a canonical device API")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "homegate.toml")]
    config: PathBuf,

    /// Bind address for web server
    #[arg(short, long)]
    bind: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Homegate v{}", env!("CARGO_PKG_VERSION"));

    let mut config = config::load_config(&args.config)?;

    if let Some(bind) = args.bind {
        config.daemon.bind = bind;
    }

    info!(
        bridge = %config.bridge.name,
        manufacturer = %config.bridge.manufacturer,
        model = %config.bridge.model,
        accessories = config.accessories.len(),
        "Configuration loaded"
    );

    let state = state::AppState::new(&config).await?;

    server::run(state, &config.daemon.bind).await
}
