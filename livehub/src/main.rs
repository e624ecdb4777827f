mod migrations;
mod server;

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::info;

use livehub_api::LiveHub;
use livehub_core::{
    bootstrap::{init_store, load_config},
    logging,
    service::JwtService,
};

use server::LiveHubServer;

#[derive(Parser, Debug)]
#[command(name = "livehub")]
#[command(about = "LiveHub real-time session server", long_about = None)]
struct Args {
    /// Path to a YAML or TOML config file
    #[arg(long, short, env = "LIVEHUB_CONFIG_PATH")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1. Load and validate configuration
    let config = load_config(args.config.as_deref())?;

    // 2. Initialize logging
    logging::init_logging(&config.logging)?;
    info!("LiveHub server starting...");
    info!("HTTP address: {}", config.http_address());

    // 3. Pick the store, migrating PostgreSQL when configured
    let handle = init_store(&config).await?;
    if let Some(pool) = &handle.pool {
        if config.database.run_migrations {
            migrations::run_migrations(pool).await?;
        }
    }

    // 4. Identity verification
    let jwt_service = JwtService::new(&config.jwt)
        .map_err(|e| anyhow::anyhow!("Failed to initialize JWT service: {e}"))?;

    // 5. The hub itself
    let hub = Arc::new(LiveHub::new(
        &config.hub,
        handle.store,
        Arc::new(jwt_service),
    ));
    info!(
        max_connections = config.hub.max_connections,
        max_per_room = config.hub.max_per_room,
        "Hub initialized"
    );

    LiveHubServer::new(config, hub, handle.pool).start().await
}
