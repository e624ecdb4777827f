use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::id::{RoomId, UserId};

/// Maximum chat message length in characters
pub const CHAT_MESSAGE_MAX_CHARS: usize = 2000;

/// The only emoji accepted as chat reactions
pub const ALLOWED_REACTIONS: [&str; 10] = [
    "👍", "❤️", "😂", "😮", "😢", "😡", "🎉", "🔥", "💯", "👏",
];

#[must_use]
pub fn is_allowed_reaction(emoji: &str) -> bool {
    ALLOWED_REACTIONS.contains(&emoji)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String, // nanoid(12)
    pub room_id: RoomId,
    pub user_id: UserId,
    pub username: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(room_id: RoomId, user_id: UserId, username: String, message: String) -> Self {
        Self {
            id: super::id::generate_id(),
            room_id,
            user_id,
            username,
            message,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionAction {
    Add,
    Remove,
}

/// One user's reaction to one message; unique per (message, user)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReaction {
    pub message_id: String,
    pub room_id: RoomId,
    pub user_id: UserId,
    pub username: String,
    pub emoji: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reactor {
    pub user_id: UserId,
    pub username: String,
}

/// Per-emoji tally of a message's reactions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionGroup {
    pub emoji: String,
    pub count: u32,
    pub users: Vec<Reactor>,
}

/// Group reactions by emoji, most popular first.
///
/// Ties are broken by emoji so the result is stable; reactors keep
/// the order in which they are supplied.
pub fn group_reactions<'a, I>(reactions: I) -> Vec<ReactionGroup>
where
    I: IntoIterator<Item = &'a ChatReaction>,
{
    let mut groups: BTreeMap<&str, Vec<Reactor>> = BTreeMap::new();
    for reaction in reactions {
        groups.entry(reaction.emoji.as_str()).or_default().push(Reactor {
            user_id: reaction.user_id.clone(),
            username: reaction.username.clone(),
        });
    }

    let mut grouped: Vec<ReactionGroup> = groups
        .into_iter()
        .map(|(emoji, users)| ReactionGroup {
            emoji: emoji.to_string(),
            count: u32::try_from(users.len()).unwrap_or(u32::MAX),
            users,
        })
        .collect();
    // Stable sort keeps the BTreeMap's emoji order among equal counts
    grouped.sort_by(|a, b| b.count.cmp(&a.count));
    grouped
}
