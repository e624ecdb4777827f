use sqlx::{PgPool, Row};

use crate::{
    models::{LiveRoomRecord, RoomId, StreamKind},
    Result,
};

/// Primary and guest stream lookups
#[derive(Clone)]
pub struct StreamRepository {
    pool: PgPool,
}

impl StreamRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Live primary stream first, then a live unexpired guest stream
    pub async fn find_live(&self, room_id: &RoomId) -> Result<Option<LiveRoomRecord>> {
        let row = sqlx::query(
            r"
            SELECT id, streamer_id
            FROM streams
            WHERE id = $1 AND is_live
            ",
        )
        .bind(room_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return Ok(Some(LiveRoomRecord {
                room_id: row.try_get("id")?,
                owner_id: row.try_get("streamer_id")?,
                kind: StreamKind::Primary,
            }));
        }

        let row = sqlx::query(
            r"
            SELECT id, guest_id
            FROM guest_streams
            WHERE id = $1 AND is_live AND expires_at > NOW()
            ",
        )
        .bind(room_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| -> Result<LiveRoomRecord> {
            Ok(LiveRoomRecord {
                room_id: row.try_get("id")?,
                owner_id: row.try_get("guest_id")?,
                kind: StreamKind::Guest,
            })
        })
        .transpose()
    }

    /// Write the viewer count to whichever stream table holds the room
    pub async fn set_viewer_count(&self, room_id: &RoomId, count: u32) -> Result<()> {
        let count = i32::try_from(count).unwrap_or(i32::MAX);
        let result = sqlx::query(
            r"
            UPDATE streams SET viewer_count = $2, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(room_id)
        .bind(count)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            sqlx::query(
                r"
                UPDATE guest_streams SET viewer_count = $2
                WHERE id = $1
                ",
            )
            .bind(room_id)
            .bind(count)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }
}
