use anyhow::Context;
use sqlx::PgPool;
use tracing::info;

/// Apply the SQL files under the workspace `migrations/` directory
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    let migrator = sqlx::migrate!("../migrations");
    info!(known = migrator.iter().count(), "Applying schema migrations");
    migrator
        .run(pool)
        .await
        .context("Schema migration failed")?;
    info!("Schema is up to date");
    Ok(())
}
