use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use tracing::info;

use crate::config::DatabaseConfig;

/// Open the PostgreSQL pool. Migrations are left to the caller.
pub async fn init_database(config: &DatabaseConfig) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .min_connections(config.min_connections)
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
        .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
        .connect(&config.url)
        .await
        .context("Cannot connect to PostgreSQL")?;

    info!(
        min = config.min_connections,
        max = config.max_connections,
        "Database pool ready"
    );
    Ok(pool)
}
