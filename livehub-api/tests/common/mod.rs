//! Shared fixtures for hub integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use livehub_api::LiveHub;
use livehub_core::{
    config::HubConfig,
    models::{
        ActivityEvent, AnalyticsCounters, ChatMessage, ChatReaction, ConnectionId,
        GiftTransaction, GiftType, GuestStreamRecord, Identity, LiveRoomRecord, Poll,
        ReactionGroup, RoomId, StreamRecord, UserId, UserRole,
    },
    repository::{HubStore, MemoryStore},
    service::IdentityVerifier,
    Error, Result,
};
use livehub_session::ServerEvent;
use mockall::mock;
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};
use tokio::sync::{mpsc, Notify};

pub const ROOM: &str = "room-1";
pub const STREAMER: &str = "streamer";
pub const GUEST_ROOM: &str = "guest-room";

mock! {
    pub Verifier {}

    #[async_trait]
    impl IdentityVerifier for Verifier {
        async fn verify(&self, token: &str) -> Result<Identity>;
    }
}

/// Tokens are the user id itself; "bad" is rejected
pub fn verifier() -> MockVerifier {
    let mut verifier = MockVerifier::new();
    verifier.expect_verify().returning(|token: &str| {
        if token == "bad" {
            return Err(Error::Authentication("Invalid token".to_string()));
        }
        let role = if token == STREAMER {
            UserRole::Streamer
        } else {
            UserRole::Viewer
        };
        Ok(Identity::new(
            UserId::from(token),
            format!("{token}-name"),
            role,
        ))
    });
    verifier
}

/// Holds the next `deactivate_active_polls` open after it has written
#[derive(Clone, Default)]
pub struct PollGate {
    pub reached: Arc<Notify>,
    pub release: Arc<Notify>,
}

/// Memory store that counts writes and can be told to fail them
pub struct CountingStore {
    pub inner: MemoryStore,
    writes: AtomicUsize,
    fail_writes: AtomicBool,
    poll_gate: Mutex<Option<PollGate>>,
}

impl CountingStore {
    pub fn new() -> Self {
        let inner = MemoryStore::new();
        inner.insert_stream(StreamRecord::live(
            RoomId::from(ROOM),
            UserId::from(STREAMER),
            "Test stream",
        ));
        inner.insert_guest_stream(GuestStreamRecord::live(
            RoomId::from(GUEST_ROOM),
            UserId::from("guest_host"),
            "Host",
        ));
        Self {
            inner,
            writes: AtomicUsize::new(0),
            fail_writes: AtomicBool::new(false),
            poll_gate: Mutex::new(None),
        }
    }

    pub fn hold_poll_deactivation(&self) -> PollGate {
        let gate = PollGate::default();
        *self.poll_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn write(&self) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(Error::Internal("write refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl HubStore for CountingStore {
    async fn find_live_room(&self, room_id: &RoomId) -> Result<Option<LiveRoomRecord>> {
        self.inner.find_live_room(room_id).await
    }

    async fn set_viewer_count(&self, room_id: &RoomId, count: u32) -> Result<()> {
        self.write()?;
        self.inner.set_viewer_count(room_id, count).await
    }

    async fn append_chat_message(&self, message: &ChatMessage) -> Result<()> {
        self.write()?;
        self.inner.append_chat_message(message).await
    }

    async fn upsert_reaction(&self, reaction: &ChatReaction) -> Result<()> {
        self.write()?;
        self.inner.upsert_reaction(reaction).await
    }

    async fn delete_reaction(
        &self,
        message_id: &str,
        user_id: &UserId,
        emoji: &str,
    ) -> Result<bool> {
        self.write()?;
        self.inner.delete_reaction(message_id, user_id, emoji).await
    }

    async fn group_reactions(&self, message_id: &str) -> Result<Vec<ReactionGroup>> {
        self.inner.group_reactions(message_id).await
    }

    async fn deactivate_active_polls(&self, room_id: &RoomId) -> Result<u64> {
        self.write()?;
        let changed = self.inner.deactivate_active_polls(room_id).await?;
        let gate = self.poll_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.reached.notify_one();
            gate.release.notified().await;
        }
        Ok(changed)
    }

    async fn create_poll(&self, poll: &Poll) -> Result<()> {
        self.write()?;
        self.inner.create_poll(poll).await
    }

    async fn load_poll(&self, poll_id: &str) -> Result<Option<Poll>> {
        self.inner.load_poll(poll_id).await
    }

    async fn save_poll(&self, poll: &Poll) -> Result<()> {
        self.write()?;
        self.inner.save_poll(poll).await
    }

    async fn record_gift(&self, gift: &GiftTransaction) -> Result<()> {
        self.write()?;
        self.inner.record_gift(gift).await
    }

    async fn gift_catalog(&self) -> Result<Vec<GiftType>> {
        self.inner.gift_catalog().await
    }

    async fn cumulative_analytics(&self, room_id: &RoomId) -> Result<AnalyticsCounters> {
        self.inner.cumulative_analytics(room_id).await
    }

    async fn record_activity(&self, room_id: &RoomId, event: ActivityEvent) -> Result<()> {
        self.write()?;
        self.inner.record_activity(room_id, event).await
    }
}

pub struct Harness {
    pub hub: Arc<LiveHub>,
    pub store: Arc<CountingStore>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(&HubConfig::default())
    }

    pub fn with_config(config: &HubConfig) -> Self {
        let store = Arc::new(CountingStore::new());
        let hub = Arc::new(LiveHub::new(config, store.clone(), Arc::new(verifier())));
        Self { hub, store }
    }

    pub fn connect(&self) -> Client {
        let (id, rx) = self.hub.connect().expect("connection accepted");
        Client { id, rx }
    }

    pub async fn send(&self, client: &Client, frame: serde_json::Value) {
        self.hub.handle_text(&client.id, &frame.to_string()).await;
    }

    /// Authenticate as `user` and join `room`, discarding the replies
    pub async fn join(&self, client: &mut Client, user: &str, room: &str) {
        self.send(client, serde_json::json!({"type": "authenticate", "token": user}))
            .await;
        self.send(client, serde_json::json!({"type": "join_stream", "streamId": room}))
            .await;
        client.drain();
    }

    pub fn room() -> RoomId {
        RoomId::from(ROOM)
    }
}

pub struct Client {
    pub id: ConnectionId,
    rx: mpsc::Receiver<Arc<str>>,
}

impl Client {
    /// Next queued event; panics when nothing was delivered
    pub fn next(&mut self) -> ServerEvent {
        let frame = self.rx.try_recv().expect("an event was delivered");
        serde_json::from_str(&frame).expect("frame is a server event")
    }

    pub fn next_json(&mut self) -> serde_json::Value {
        let frame = self.rx.try_recv().expect("an event was delivered");
        serde_json::from_str(&frame).expect("frame is JSON")
    }

    pub fn is_idle(&mut self) -> bool {
        self.rx.try_recv().is_err()
    }

    pub fn drain(&mut self) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(frame) = self.rx.try_recv() {
            events.push(serde_json::from_str(&frame).expect("frame is a server event"));
        }
        events
    }
}
