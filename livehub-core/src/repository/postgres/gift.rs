use sqlx::{postgres::PgRow, PgPool, Row};

use crate::{
    models::{GiftRarity, GiftTransaction, GiftType},
    Error, Result,
};

/// Gift catalog and delivered gift transactions
#[derive(Clone)]
pub struct GiftRepository {
    pool: PgPool,
}

impl GiftRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, gift: &GiftTransaction) -> Result<()> {
        let amount = i32::try_from(gift.amount)
            .map_err(|_| Error::InvalidInput("Gift amount out of range".to_string()))?;
        let total_value = i64::try_from(gift.total_value)
            .map_err(|_| Error::InvalidInput("Gift value out of range".to_string()))?;

        sqlx::query(
            r"
            INSERT INTO gifts (
                id, room_id, sender_id, sender_username, recipient_id, recipient_username,
                gift_type_id, amount, total_value, message, is_anonymous, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ",
        )
        .bind(&gift.id)
        .bind(&gift.room_id)
        .bind(&gift.sender_id)
        .bind(&gift.sender_username)
        .bind(&gift.recipient_id)
        .bind(&gift.recipient_username)
        .bind(&gift.gift_type.id)
        .bind(amount)
        .bind(total_value)
        .bind(&gift.message)
        .bind(gift.is_anonymous)
        .bind(gift.timestamp)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Catalog ordered by price, cheapest first
    pub async fn list_types(&self) -> Result<Vec<GiftType>> {
        let rows = sqlx::query(
            r"
            SELECT id, name, emoji, price, rarity
            FROM gift_types
            ORDER BY price, id
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_type).collect()
    }

    fn row_to_type(row: &PgRow) -> Result<GiftType> {
        let price: i64 = row.try_get("price")?;
        let rarity: String = row.try_get("rarity")?;
        let rarity: GiftRarity = serde_json::from_value(serde_json::Value::String(rarity))?;

        Ok(GiftType {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            emoji: row.try_get("emoji")?,
            price: u64::try_from(price)
                .map_err(|_| Error::Internal(format!("Negative gift price: {price}")))?,
            rarity,
        })
    }
}
