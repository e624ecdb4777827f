use sqlx::{postgres::PgRow, PgPool, Row};

use crate::{
    models::{Poll, PollOption, RoomId},
    Error, Result,
};

/// Poll repository. Options and their voter sets are stored as JSONB.
#[derive(Clone)]
pub struct PollRepository {
    pool: PgPool,
}

impl PollRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, poll: &Poll) -> Result<()> {
        self.upsert(poll).await
    }

    /// Write the snapshot unless the stored row already has an equal or newer version
    pub async fn save(&self, poll: &Poll) -> Result<()> {
        self.upsert(poll).await
    }

    async fn upsert(&self, poll: &Poll) -> Result<()> {
        let options = serde_json::to_value(&poll.options)?;
        let total_votes = i32::try_from(poll.total_votes)
            .map_err(|_| Error::InvalidInput("Vote total out of range".to_string()))?;

        sqlx::query(
            r"
            INSERT INTO polls (
                id, room_id, creator_id, creator_username, question, options,
                allow_multiple_votes, show_results, total_votes, is_active,
                created_at, expires_at, version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (id) DO UPDATE SET
                options = EXCLUDED.options,
                show_results = EXCLUDED.show_results,
                total_votes = EXCLUDED.total_votes,
                is_active = EXCLUDED.is_active,
                version = EXCLUDED.version
            WHERE polls.version < EXCLUDED.version
            ",
        )
        .bind(&poll.id)
        .bind(&poll.room_id)
        .bind(&poll.creator_id)
        .bind(&poll.creator_username)
        .bind(&poll.question)
        .bind(options)
        .bind(poll.allow_multiple_votes)
        .bind(poll.show_results)
        .bind(total_votes)
        .bind(poll.is_active)
        .bind(poll.created_at)
        .bind(poll.expires_at)
        .bind(poll.version)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_by_id(&self, poll_id: &str) -> Result<Option<Poll>> {
        let row = sqlx::query(
            r"
            SELECT id, room_id, creator_id, creator_username, question, options,
                   allow_multiple_votes, show_results, total_votes, is_active,
                   created_at, expires_at, version
            FROM polls
            WHERE id = $1
            ",
        )
        .bind(poll_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| Self::row_to_poll(&row)).transpose()
    }

    /// Deactivate every active poll in the room, bumping each version
    pub async fn deactivate_active(&self, room_id: &RoomId) -> Result<u64> {
        let result = sqlx::query(
            r"
            UPDATE polls
            SET is_active = FALSE, version = version + 1
            WHERE room_id = $1 AND is_active
            ",
        )
        .bind(room_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    fn row_to_poll(row: &PgRow) -> Result<Poll> {
        let options: serde_json::Value = row.try_get("options")?;
        let options: Vec<PollOption> = serde_json::from_value(options)?;
        let total_votes: i32 = row.try_get("total_votes")?;

        Ok(Poll {
            id: row.try_get("id")?,
            room_id: row.try_get("room_id")?,
            creator_id: row.try_get("creator_id")?,
            creator_username: row.try_get("creator_username")?,
            question: row.try_get("question")?,
            options,
            allow_multiple_votes: row.try_get("allow_multiple_votes")?,
            show_results: row.try_get("show_results")?,
            total_votes: u32::try_from(total_votes).unwrap_or_default(),
            is_active: row.try_get("is_active")?,
            created_at: row.try_get("created_at")?,
            expires_at: row.try_get("expires_at")?,
            version: row.try_get("version")?,
        })
    }
}
