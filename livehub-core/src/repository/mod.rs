pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::{
    models::{
        ActivityEvent, AnalyticsCounters, ChatMessage, ChatReaction, GiftTransaction, GiftType,
        LiveRoomRecord, Poll, ReactionGroup, RoomId, UserId,
    },
    Result,
};

pub use memory::MemoryStore;
pub use postgres::{
    AnalyticsRepository, ChatRepository, GiftRepository, PgStore, PollRepository,
    ReactionRepository, StreamRepository,
};

/// Persistence consumed by the real-time hub.
///
/// Every call is independent; the hub never holds a lock across one.
#[async_trait]
pub trait HubStore: Send + Sync {
    /// Resolve a live room, trying primary streams before guest streams.
    async fn find_live_room(&self, room_id: &RoomId) -> Result<Option<LiveRoomRecord>>;

    async fn set_viewer_count(&self, room_id: &RoomId, count: u32) -> Result<()>;

    async fn append_chat_message(&self, message: &ChatMessage) -> Result<()>;

    /// Insert or replace the reaction held by `(message_id, user_id)`.
    async fn upsert_reaction(&self, reaction: &ChatReaction) -> Result<()>;

    /// Delete a matching reaction; returns whether one existed.
    async fn delete_reaction(&self, message_id: &str, user_id: &UserId, emoji: &str)
        -> Result<bool>;

    async fn group_reactions(&self, message_id: &str) -> Result<Vec<ReactionGroup>>;

    /// Mark every active poll in the room inactive; returns how many changed.
    async fn deactivate_active_polls(&self, room_id: &RoomId) -> Result<u64>;

    async fn create_poll(&self, poll: &Poll) -> Result<()>;

    async fn load_poll(&self, poll_id: &str) -> Result<Option<Poll>>;

    /// Persist a poll snapshot. Snapshots whose `version` is not newer than
    /// the stored one are ignored.
    async fn save_poll(&self, poll: &Poll) -> Result<()>;

    async fn record_gift(&self, gift: &GiftTransaction) -> Result<()>;

    async fn gift_catalog(&self) -> Result<Vec<GiftType>>;

    /// Today's (UTC) counters for the room; zeroed if nothing was recorded.
    async fn cumulative_analytics(&self, room_id: &RoomId) -> Result<AnalyticsCounters>;

    async fn record_activity(&self, room_id: &RoomId, event: ActivityEvent) -> Result<()>;
}
