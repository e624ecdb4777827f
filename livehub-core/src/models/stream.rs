use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::id::{RoomId, UserId};

/// Lifetime of an ephemeral guest stream
pub const GUEST_STREAM_TTL_HOURS: i64 = 2;

/// Which record store a live room was resolved from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    Primary,
    Guest,
}

/// Persisted stream owned by a registered broadcaster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamRecord {
    pub id: RoomId,
    pub streamer_id: UserId,
    pub title: String,
    pub is_live: bool,
    pub viewer_count: u32,
    pub started_at: Option<DateTime<Utc>>,
}

impl StreamRecord {
    #[must_use]
    pub fn live(id: RoomId, streamer_id: UserId, title: impl Into<String>) -> Self {
        Self {
            id,
            streamer_id,
            title: title.into(),
            is_live: true,
            viewer_count: 0,
            started_at: Some(Utc::now()),
        }
    }
}

/// Ephemeral stream started without an account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuestStreamRecord {
    pub id: RoomId,
    /// Synthetic broadcaster identity
    pub guest_id: UserId,
    pub guest_display_name: String,
    pub title: String,
    pub is_live: bool,
    pub viewer_count: u32,
    pub expires_at: DateTime<Utc>,
}

impl GuestStreamRecord {
    #[must_use]
    pub fn live(id: RoomId, guest_id: UserId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            guest_id,
            guest_display_name: display_name.into(),
            title: String::new(),
            is_live: true,
            viewer_count: 0,
            expires_at: Utc::now() + Duration::hours(GUEST_STREAM_TTL_HOURS),
        }
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// A live room as resolved by the persistence collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveRoomRecord {
    pub room_id: RoomId,
    /// Identity that holds the streamer role in this room
    pub owner_id: UserId,
    pub kind: StreamKind,
}

impl From<&StreamRecord> for LiveRoomRecord {
    fn from(stream: &StreamRecord) -> Self {
        Self {
            room_id: stream.id.clone(),
            owner_id: stream.streamer_id.clone(),
            kind: StreamKind::Primary,
        }
    }
}

impl From<&GuestStreamRecord> for LiveRoomRecord {
    fn from(stream: &GuestStreamRecord) -> Self {
        Self {
            room_id: stream.id.clone(),
            owner_id: stream.guest_id.clone(),
            kind: StreamKind::Guest,
        }
    }
}
