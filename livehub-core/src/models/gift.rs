use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{generate_id, RoomId, UserId};

pub const GIFT_MIN_AMOUNT: u32 = 1;
pub const GIFT_MAX_AMOUNT: u32 = 100;
pub const GIFT_MESSAGE_MAX_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GiftRarity {
    Common,
    Rare,
    Epic,
    Legendary,
}

/// Catalog entry; `price` is the unit price in cents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GiftType {
    pub id: String,
    pub name: String,
    pub emoji: String,
    pub price: u64,
    pub rarity: GiftRarity,
}

const CATALOG: [(&str, &str, &str, u64, GiftRarity); 14] = [
    ("heart", "Heart", "❤️", 10, GiftRarity::Common),
    ("thumbs_up", "Thumbs Up", "👍", 15, GiftRarity::Common),
    ("clap", "Clap", "👏", 20, GiftRarity::Common),
    ("fire", "Fire", "🔥", 25, GiftRarity::Common),
    ("star", "Star", "⭐", 30, GiftRarity::Common),
    ("diamond", "Diamond", "💎", 100, GiftRarity::Rare),
    ("crown", "Crown", "👑", 150, GiftRarity::Rare),
    ("rocket", "Rocket", "🚀", 200, GiftRarity::Rare),
    ("trophy", "Trophy", "🏆", 300, GiftRarity::Epic),
    ("champagne", "Champagne", "🍾", 400, GiftRarity::Epic),
    ("unicorn", "Unicorn", "🦄", 500, GiftRarity::Epic),
    ("rainbow", "Rainbow", "🌈", 1000, GiftRarity::Legendary),
    ("castle", "Castle", "🏰", 2000, GiftRarity::Legendary),
    ("spaceship", "Spaceship", "🛸", 5000, GiftRarity::Legendary),
];

/// The static gift catalog, cheapest first
#[must_use]
pub fn default_gift_catalog() -> Vec<GiftType> {
    CATALOG
        .iter()
        .map(|(id, name, emoji, price, rarity)| GiftType {
            id: (*id).to_string(),
            name: (*name).to_string(),
            emoji: (*emoji).to_string(),
            price: *price,
            rarity: *rarity,
        })
        .collect()
}

#[must_use]
pub const fn is_valid_amount(amount: u32) -> bool {
    amount >= GIFT_MIN_AMOUNT && amount <= GIFT_MAX_AMOUNT
}

/// One delivered gift. Persisted, broadcast, then dropped from memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GiftTransaction {
    pub id: String,
    pub room_id: RoomId,
    pub sender_id: UserId,
    pub sender_username: String,
    pub recipient_id: UserId,
    pub recipient_username: String,
    pub gift_type: GiftType,
    pub amount: u32,
    pub total_value: u64,
    pub message: String,
    pub is_anonymous: bool,
    pub timestamp: DateTime<Utc>,
}

impl GiftTransaction {
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        room_id: RoomId,
        sender_id: UserId,
        sender_username: String,
        recipient_id: UserId,
        recipient_username: String,
        gift_type: GiftType,
        amount: u32,
        message: String,
        is_anonymous: bool,
    ) -> Self {
        let total_value = gift_type.price * u64::from(amount);
        Self {
            id: generate_id(),
            room_id,
            sender_id,
            sender_username,
            recipient_id,
            recipient_username,
            gift_type,
            amount,
            total_value,
            message,
            is_anonymous,
            timestamp: Utc::now(),
        }
    }

    /// Broadcast form, with the sender hidden when the gift is anonymous
    #[must_use]
    pub fn public_view(&self) -> GiftView {
        GiftView {
            id: self.id.clone(),
            gift_type: self.gift_type.clone(),
            amount: self.amount,
            total_value: self.total_value,
            sender_username: if self.is_anonymous {
                "Anonymous".to_string()
            } else {
                self.sender_username.clone()
            },
            recipient_username: self.recipient_username.clone(),
            message: self.message.clone(),
            is_anonymous: self.is_anonymous,
            timestamp: self.timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GiftView {
    pub id: String,
    pub gift_type: GiftType,
    pub amount: u32,
    pub total_value: u64,
    pub sender_username: String,
    pub recipient_username: String,
    pub message: String,
    pub is_anonymous: bool,
    pub timestamp: DateTime<Utc>,
}
