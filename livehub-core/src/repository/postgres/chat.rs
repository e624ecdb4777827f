use sqlx::PgPool;

use crate::{models::ChatMessage, Result};

/// Chat message repository for database operations
#[derive(Clone)]
pub struct ChatRepository {
    pool: PgPool,
}

impl ChatRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, message: &ChatMessage) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO chat_messages (id, room_id, user_id, username, message, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(&message.id)
        .bind(&message.room_id)
        .bind(&message.user_id)
        .bind(&message.username)
        .bind(&message.message)
        .bind(message.timestamp)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
