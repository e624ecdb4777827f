//! Persistence selection

use std::sync::Arc;
use sqlx::PgPool;
use tracing::info;

use crate::{
    repository::{HubStore, MemoryStore, PgStore},
    Config,
};

use super::database::init_database;

/// The store picked from configuration, plus the pool when one is open
pub struct StoreHandle {
    pub store: Arc<dyn HubStore>,
    pub pool: Option<PgPool>,
}

/// PostgreSQL when `database.url` is set, otherwise the in-memory store
pub async fn init_store(config: &Config) -> anyhow::Result<StoreHandle> {
    if config.uses_database() {
        let pool = init_database(&config.database).await?;
        Ok(StoreHandle {
            store: Arc::new(PgStore::new(pool.clone())),
            pool: Some(pool),
        })
    } else {
        info!("No database configured, using in-memory store");
        Ok(StoreHandle {
            store: Arc::new(MemoryStore::new()),
            pool: None,
        })
    }
}
