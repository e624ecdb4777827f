use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;

use super::HubStore;
use crate::{
    models::{
        analytics_day, default_gift_catalog, group_reactions, ActivityEvent, AnalyticsCounters,
        ChatMessage, ChatReaction, GiftTransaction, GiftType, GuestStreamRecord, LiveRoomRecord,
        Poll, ReactionGroup, RoomId, StreamRecord, UserId,
    },
    Result,
};

/// Process-local store used when no database is configured
pub struct MemoryStore {
    streams: DashMap<RoomId, StreamRecord>,
    guest_streams: DashMap<RoomId, GuestStreamRecord>,
    messages: Mutex<Vec<ChatMessage>>,
    /// Keyed by (message_id, user_id)
    reactions: DashMap<(String, UserId), ChatReaction>,
    polls: DashMap<String, Poll>,
    gifts: Mutex<Vec<GiftTransaction>>,
    analytics: DashMap<(RoomId, NaiveDate), AnalyticsCounters>,
    catalog: Vec<GiftType>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            streams: DashMap::new(),
            guest_streams: DashMap::new(),
            messages: Mutex::new(Vec::new()),
            reactions: DashMap::new(),
            polls: DashMap::new(),
            gifts: Mutex::new(Vec::new()),
            analytics: DashMap::new(),
            catalog: default_gift_catalog(),
        }
    }

    pub fn insert_stream(&self, stream: StreamRecord) {
        self.streams.insert(stream.id.clone(), stream);
    }

    pub fn insert_guest_stream(&self, stream: GuestStreamRecord) {
        self.guest_streams.insert(stream.id.clone(), stream);
    }

    /// Persisted viewer count of a primary or guest stream
    #[must_use]
    pub fn viewer_count(&self, room_id: &RoomId) -> Option<u32> {
        self.streams
            .get(room_id)
            .map(|s| s.viewer_count)
            .or_else(|| self.guest_streams.get(room_id).map(|s| s.viewer_count))
    }

    #[must_use]
    pub fn chat_messages(&self, room_id: &RoomId) -> Vec<ChatMessage> {
        self.messages
            .lock()
            .iter()
            .filter(|m| &m.room_id == room_id)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn gifts(&self, room_id: &RoomId) -> Vec<GiftTransaction> {
        self.gifts
            .lock()
            .iter()
            .filter(|g| &g.room_id == room_id)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn poll(&self, poll_id: &str) -> Option<Poll> {
        self.polls.get(poll_id).map(|p| p.clone())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HubStore for MemoryStore {
    async fn find_live_room(&self, room_id: &RoomId) -> Result<Option<LiveRoomRecord>> {
        if let Some(stream) = self.streams.get(room_id) {
            if stream.is_live {
                return Ok(Some(LiveRoomRecord::from(&*stream)));
            }
        }

        let now = Utc::now();
        Ok(self
            .guest_streams
            .get(room_id)
            .filter(|guest| guest.is_live && !guest.is_expired(now))
            .map(|guest| LiveRoomRecord::from(&*guest)))
    }

    async fn set_viewer_count(&self, room_id: &RoomId, count: u32) -> Result<()> {
        if let Some(mut stream) = self.streams.get_mut(room_id) {
            stream.viewer_count = count;
        } else if let Some(mut guest) = self.guest_streams.get_mut(room_id) {
            guest.viewer_count = count;
        }
        Ok(())
    }

    async fn append_chat_message(&self, message: &ChatMessage) -> Result<()> {
        self.messages.lock().push(message.clone());
        Ok(())
    }

    async fn upsert_reaction(&self, reaction: &ChatReaction) -> Result<()> {
        self.reactions.insert(
            (reaction.message_id.clone(), reaction.user_id.clone()),
            reaction.clone(),
        );
        Ok(())
    }

    async fn delete_reaction(
        &self,
        message_id: &str,
        user_id: &UserId,
        emoji: &str,
    ) -> Result<bool> {
        Ok(self
            .reactions
            .remove_if(&(message_id.to_string(), user_id.clone()), |_, r| {
                r.emoji == emoji
            })
            .is_some())
    }

    async fn group_reactions(&self, message_id: &str) -> Result<Vec<ReactionGroup>> {
        let mut reactions: Vec<ChatReaction> = self
            .reactions
            .iter()
            .filter(|entry| entry.message_id == message_id)
            .map(|entry| entry.value().clone())
            .collect();
        reactions.sort_by_key(|r| r.timestamp);
        Ok(group_reactions(&reactions))
    }

    async fn deactivate_active_polls(&self, room_id: &RoomId) -> Result<u64> {
        let mut changed = 0;
        for mut poll in self.polls.iter_mut() {
            if &poll.room_id == room_id && poll.is_active {
                poll.deactivate();
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn create_poll(&self, poll: &Poll) -> Result<()> {
        self.polls.insert(poll.id.clone(), poll.clone());
        Ok(())
    }

    async fn load_poll(&self, poll_id: &str) -> Result<Option<Poll>> {
        Ok(self.poll(poll_id))
    }

    async fn save_poll(&self, poll: &Poll) -> Result<()> {
        self.polls
            .entry(poll.id.clone())
            .and_modify(|stored| {
                if poll.version > stored.version {
                    *stored = poll.clone();
                }
            })
            .or_insert_with(|| poll.clone());
        Ok(())
    }

    async fn record_gift(&self, gift: &GiftTransaction) -> Result<()> {
        self.gifts.lock().push(gift.clone());
        Ok(())
    }

    async fn gift_catalog(&self) -> Result<Vec<GiftType>> {
        Ok(self.catalog.clone())
    }

    async fn cumulative_analytics(&self, room_id: &RoomId) -> Result<AnalyticsCounters> {
        let key = (room_id.clone(), analytics_day(Utc::now()));
        Ok(self
            .analytics
            .get(&key)
            .map(|c| c.clone())
            .unwrap_or_default())
    }

    async fn record_activity(&self, room_id: &RoomId, event: ActivityEvent) -> Result<()> {
        let now = Utc::now();
        self.analytics
            .entry((room_id.clone(), analytics_day(now)))
            .or_default()
            .apply(event, now);
        Ok(())
    }
}
