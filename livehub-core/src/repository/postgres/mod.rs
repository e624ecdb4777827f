//! PostgreSQL persistence, one repository per table family

mod analytics;
mod chat;
mod gift;
mod poll;
mod reaction;
mod stream;

pub use analytics::AnalyticsRepository;
pub use chat::ChatRepository;
pub use gift::GiftRepository;
pub use poll::PollRepository;
pub use reaction::ReactionRepository;
pub use stream::StreamRepository;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;

use super::HubStore;
use crate::{
    models::{
        analytics_day, ActivityEvent, AnalyticsCounters, ChatMessage, ChatReaction,
        GiftTransaction, GiftType, LiveRoomRecord, Poll, ReactionGroup, RoomId, UserId,
    },
    Result,
};

/// `HubStore` backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgStore {
    streams: StreamRepository,
    chat: ChatRepository,
    reactions: ReactionRepository,
    polls: PollRepository,
    gifts: GiftRepository,
    analytics: AnalyticsRepository,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            streams: StreamRepository::new(pool.clone()),
            chat: ChatRepository::new(pool.clone()),
            reactions: ReactionRepository::new(pool.clone()),
            polls: PollRepository::new(pool.clone()),
            gifts: GiftRepository::new(pool.clone()),
            analytics: AnalyticsRepository::new(pool),
        }
    }
}

#[async_trait]
impl HubStore for PgStore {
    async fn find_live_room(&self, room_id: &RoomId) -> Result<Option<LiveRoomRecord>> {
        self.streams.find_live(room_id).await
    }

    async fn set_viewer_count(&self, room_id: &RoomId, count: u32) -> Result<()> {
        self.streams.set_viewer_count(room_id, count).await
    }

    async fn append_chat_message(&self, message: &ChatMessage) -> Result<()> {
        self.chat.create(message).await
    }

    async fn upsert_reaction(&self, reaction: &ChatReaction) -> Result<()> {
        self.reactions.upsert(reaction).await
    }

    async fn delete_reaction(
        &self,
        message_id: &str,
        user_id: &UserId,
        emoji: &str,
    ) -> Result<bool> {
        self.reactions.delete(message_id, user_id, emoji).await
    }

    async fn group_reactions(&self, message_id: &str) -> Result<Vec<ReactionGroup>> {
        self.reactions.grouped_by_message(message_id).await
    }

    async fn deactivate_active_polls(&self, room_id: &RoomId) -> Result<u64> {
        self.polls.deactivate_active(room_id).await
    }

    async fn create_poll(&self, poll: &Poll) -> Result<()> {
        self.polls.create(poll).await
    }

    async fn load_poll(&self, poll_id: &str) -> Result<Option<Poll>> {
        self.polls.get_by_id(poll_id).await
    }

    async fn save_poll(&self, poll: &Poll) -> Result<()> {
        self.polls.save(poll).await
    }

    async fn record_gift(&self, gift: &GiftTransaction) -> Result<()> {
        self.gifts.create(gift).await
    }

    async fn gift_catalog(&self) -> Result<Vec<GiftType>> {
        self.gifts.list_types().await
    }

    async fn cumulative_analytics(&self, room_id: &RoomId) -> Result<AnalyticsCounters> {
        self.analytics.get(room_id, analytics_day(Utc::now())).await
    }

    async fn record_activity(&self, room_id: &RoomId, event: ActivityEvent) -> Result<()> {
        self.analytics.record(room_id, event).await
    }
}
