use chrono::{NaiveDate, Utc};
use sqlx::{PgPool, Row};

use crate::{
    models::{analytics_day, ActivityEvent, AnalyticsCounters, RoomId},
    Result,
};

/// Daily analytics documents keyed by (room, UTC date)
#[derive(Clone)]
pub struct AnalyticsRepository {
    pool: PgPool,
}

impl AnalyticsRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, room_id: &RoomId, day: NaiveDate) -> Result<AnalyticsCounters> {
        let row = sqlx::query(
            r"
            SELECT counters, departures
            FROM stream_analytics
            WHERE room_id = $1 AND day = $2
            ",
        )
        .bind(room_id)
        .bind(day)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let value: serde_json::Value = row.try_get("counters")?;
                let mut counters: AnalyticsCounters = serde_json::from_value(value)?;
                let departures: i64 = row.try_get("departures")?;
                counters.departures = u64::try_from(departures).unwrap_or_default();
                Ok(counters)
            }
            None => Ok(AnalyticsCounters::default()),
        }
    }

    /// Apply one event to today's document under a row lock
    pub async fn record(&self, room_id: &RoomId, event: ActivityEvent) -> Result<()> {
        let now = Utc::now();
        let day = analytics_day(now);
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"
            INSERT INTO stream_analytics (room_id, day, counters)
            VALUES ($1, $2, $3)
            ON CONFLICT (room_id, day) DO NOTHING
            ",
        )
        .bind(room_id)
        .bind(day)
        .bind(serde_json::to_value(AnalyticsCounters::default())?)
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query(
            r"
            SELECT counters, departures
            FROM stream_analytics
            WHERE room_id = $1 AND day = $2
            FOR UPDATE
            ",
        )
        .bind(room_id)
        .bind(day)
        .fetch_one(&mut *tx)
        .await?;

        let value: serde_json::Value = row.try_get("counters")?;
        let mut counters: AnalyticsCounters = serde_json::from_value(value)?;
        let departures: i64 = row.try_get("departures")?;
        counters.departures = u64::try_from(departures).unwrap_or_default();

        counters.apply(event, now);

        sqlx::query(
            r"
            UPDATE stream_analytics
            SET counters = $3, departures = $4, updated_at = NOW()
            WHERE room_id = $1 AND day = $2
            ",
        )
        .bind(room_id)
        .bind(day)
        .bind(serde_json::to_value(&counters)?)
        .bind(i64::try_from(counters.departures).unwrap_or(i64::MAX))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}
