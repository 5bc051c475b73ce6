mod auth;
mod bootstrap;
mod commands;
mod config;
mod dispatcher;
mod gate;
mod mention;
mod message;
mod reply;
mod transport;

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,linebot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Bridge: {}", config.transport.base_url);
    info!("  Device: {}", config.transport.device);
    info!("  Command prefix: {}", config.commands.prefix);
    info!("  Authorization file: {}", config.auth.path.display());

    bootstrap::run(config).await?;

    Ok(())
}
