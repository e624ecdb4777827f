use sqlx::{postgres::PgRow, PgPool, Row};

use crate::{
    models::{group_reactions, ChatReaction, ReactionGroup, UserId},
    Result,
};

/// Reactions keyed by (message_id, user_id)
#[derive(Clone)]
pub struct ReactionRepository {
    pool: PgPool,
}

impl ReactionRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert, or replace the user's previous reaction on the message
    pub async fn upsert(&self, reaction: &ChatReaction) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO chat_reactions (message_id, room_id, user_id, username, emoji, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (message_id, user_id)
            DO UPDATE SET emoji = EXCLUDED.emoji,
                          username = EXCLUDED.username,
                          created_at = EXCLUDED.created_at
            ",
        )
        .bind(&reaction.message_id)
        .bind(&reaction.room_id)
        .bind(&reaction.user_id)
        .bind(&reaction.username)
        .bind(&reaction.emoji)
        .bind(reaction.timestamp)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn delete(&self, message_id: &str, user_id: &UserId, emoji: &str) -> Result<bool> {
        let result = sqlx::query(
            r"
            DELETE FROM chat_reactions
            WHERE message_id = $1 AND user_id = $2 AND emoji = $3
            ",
        )
        .bind(message_id)
        .bind(user_id)
        .bind(emoji)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn grouped_by_message(&self, message_id: &str) -> Result<Vec<ReactionGroup>> {
        let rows = sqlx::query(
            r"
            SELECT message_id, room_id, user_id, username, emoji, created_at
            FROM chat_reactions
            WHERE message_id = $1
            ORDER BY created_at
            ",
        )
        .bind(message_id)
        .fetch_all(&self.pool)
        .await?;

        let reactions = rows
            .iter()
            .map(Self::row_to_reaction)
            .collect::<Result<Vec<_>>>()?;
        Ok(group_reactions(&reactions))
    }

    fn row_to_reaction(row: &PgRow) -> Result<ChatReaction> {
        Ok(ChatReaction {
            message_id: row.try_get("message_id")?,
            room_id: row.try_get("room_id")?,
            user_id: row.try_get("user_id")?,
            username: row.try_get("username")?,
            emoji: row.try_get("emoji")?,
            timestamp: row.try_get("created_at")?,
        })
    }
}
