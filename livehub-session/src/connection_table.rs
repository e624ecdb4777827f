use dashmap::DashMap;
use livehub_core::models::{ConnectionId, Identity, RoomId, UserId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::info;

use crate::{Error, Result};

/// Why a frame could not be queued for a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("client too slow, outbound queue full")]
    Full,
    #[error("client disconnected")]
    Closed,
}

/// Sending half of a connection's bounded outbound queue.
///
/// Frames are pre-serialized JSON shared between recipients.
#[derive(Debug, Clone)]
pub struct OutboundSender(mpsc::Sender<Arc<str>>);

impl OutboundSender {
    #[must_use]
    pub const fn new(sender: mpsc::Sender<Arc<str>>) -> Self {
        Self(sender)
    }

    /// Queue a frame without waiting
    pub fn try_deliver(&self, frame: Arc<str>) -> std::result::Result<(), DeliveryError> {
        self.0.try_send(frame).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => DeliveryError::Full,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }
}

/// Membership edge from a connection to its current room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSeat {
    pub room_id: RoomId,
    /// Holds the streamer role in this room only
    pub is_streamer: bool,
    pub joined_at: Instant,
}

impl RoomSeat {
    #[must_use]
    pub fn new(room_id: RoomId, is_streamer: bool) -> Self {
        Self {
            room_id,
            is_streamer,
            joined_at: Instant::now(),
        }
    }
}

/// Live session state of one transport connection
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: ConnectionId,
    pub sender: OutboundSender,
    /// `None` until authenticated or joined as guest
    pub identity: Option<Identity>,
    pub is_guest: bool,
    pub room: Option<RoomSeat>,
    pub connected_at: Instant,
    pub last_activity: Instant,
    pub message_count: u64,
}

impl Connection {
    fn new(id: ConnectionId, sender: OutboundSender) -> Self {
        let now = Instant::now();
        Self {
            id,
            sender,
            identity: None,
            is_guest: false,
            room: None,
            connected_at: now,
            last_activity: now,
            message_count: 0,
        }
    }

    #[must_use]
    pub fn duration(&self) -> Duration {
        self.connected_at.elapsed()
    }

    #[must_use]
    pub fn room_id(&self) -> Option<&RoomId> {
        self.room.as_ref().map(|seat| &seat.room_id)
    }
}

/// Connection metrics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionMetrics {
    pub active_connections: usize,
    pub total_connections: u64,
    pub total_messages: u64,
    pub authenticated: usize,
    pub in_room: usize,
}

/// Connection id to live session state
pub struct ConnectionTable {
    connections: DashMap<ConnectionId, Connection>,
    max_connections: usize,
    total_connections: AtomicU64,
    total_messages: AtomicU64,
}

impl ConnectionTable {
    #[must_use]
    pub fn new(max_connections: usize) -> Self {
        Self {
            connections: DashMap::new(),
            max_connections,
            total_connections: AtomicU64::new(0),
            total_messages: AtomicU64::new(0),
        }
    }

    /// Create an unauthenticated entry
    pub fn register(&self, connection_id: ConnectionId, sender: OutboundSender) -> Result<()> {
        if self.connections.len() >= self.max_connections {
            return Err(Error::ConnectionLimit(self.max_connections));
        }

        self.connections.insert(
            connection_id.clone(),
            Connection::new(connection_id.clone(), sender),
        );
        self.total_connections.fetch_add(1, Ordering::Relaxed);

        info!(
            connection_id = %connection_id,
            total_connections = self.connections.len(),
            "Connection registered"
        );
        Ok(())
    }

    /// Attach a verified identity. Re-authenticating replaces it.
    pub fn authenticate(&self, connection_id: &ConnectionId, identity: Identity) -> Result<()> {
        let mut conn = self
            .connections
            .get_mut(connection_id)
            .ok_or_else(|| Error::Unauthenticated(connection_id.clone()))?;
        conn.identity = Some(identity);
        conn.is_guest = false;
        Ok(())
    }

    /// Attach a synthesized guest identity
    pub fn attach_guest(&self, connection_id: &ConnectionId, identity: Identity) -> Result<()> {
        let mut conn = self
            .connections
            .get_mut(connection_id)
            .ok_or_else(|| Error::ConnectionNotFound(connection_id.clone()))?;
        conn.identity = Some(identity);
        conn.is_guest = true;
        Ok(())
    }

    pub fn set_room(&self, connection_id: &ConnectionId, seat: Option<RoomSeat>) -> Result<()> {
        let mut conn = self
            .connections
            .get_mut(connection_id)
            .ok_or_else(|| Error::ConnectionNotFound(connection_id.clone()))?;
        conn.room = seat;
        Ok(())
    }

    /// Clear the room pointer and return what it held.
    ///
    /// Only one of several concurrent callers observes `Some`, which makes
    /// leave reconciliation run at most once.
    pub fn take_room(&self, connection_id: &ConnectionId) -> Option<RoomSeat> {
        self.connections
            .get_mut(connection_id)
            .and_then(|mut conn| conn.room.take())
    }

    pub fn get(&self, connection_id: &ConnectionId) -> Result<Connection> {
        self.connections
            .get(connection_id)
            .map(|conn| conn.clone())
            .ok_or_else(|| Error::ConnectionNotFound(connection_id.clone()))
    }

    /// Drop the entry. The caller reconciles room membership.
    pub fn remove(&self, connection_id: &ConnectionId) -> Result<Connection> {
        let (_, conn) = self
            .connections
            .remove(connection_id)
            .ok_or_else(|| Error::ConnectionNotFound(connection_id.clone()))?;

        info!(
            connection_id = %connection_id,
            duration = ?conn.duration(),
            message_count = conn.message_count,
            "Connection unregistered"
        );
        Ok(conn)
    }

    /// Every connection carrying this identity
    #[must_use]
    pub fn find_by_identity(&self, user_id: &UserId) -> Vec<Connection> {
        self.connections
            .iter()
            .filter(|entry| {
                entry
                    .identity
                    .as_ref()
                    .is_some_and(|identity| &identity.user_id == user_id)
            })
            .map(|entry| entry.value().clone())
            .collect()
    }

    #[must_use]
    pub fn sender(&self, connection_id: &ConnectionId) -> Option<OutboundSender> {
        self.connections
            .get(connection_id)
            .map(|conn| conn.sender.clone())
    }

    /// Record inbound activity for a connection
    pub fn record_message(&self, connection_id: &ConnectionId) {
        if let Some(mut conn) = self.connections.get_mut(connection_id) {
            conn.last_activity = Instant::now();
            conn.message_count += 1;
        }
        self.total_messages.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    #[must_use]
    pub fn metrics(&self) -> ConnectionMetrics {
        let mut authenticated = 0;
        let mut in_room = 0;
        for entry in self.connections.iter() {
            if entry.identity.is_some() {
                authenticated += 1;
            }
            if entry.room.is_some() {
                in_room += 1;
            }
        }

        ConnectionMetrics {
            active_connections: self.connections.len(),
            total_connections: self.total_connections.load(Ordering::Relaxed),
            total_messages: self.total_messages.load(Ordering::Relaxed),
            authenticated,
            in_room,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use livehub_core::models::UserRole;

    fn sender() -> (OutboundSender, mpsc::Receiver<Arc<str>>) {
        let (tx, rx) = mpsc::channel(2);
        (OutboundSender::new(tx), rx)
    }

    fn alice() -> Identity {
        Identity::new(UserId::from("alice"), "Alice".to_string(), UserRole::Viewer)
    }

    #[test]
    fn test_register_and_authenticate() {
        let table = ConnectionTable::new(10);
        let id = ConnectionId::from("c1");
        let (tx, _rx) = sender();
        table.register(id.clone(), tx).unwrap();

        assert!(table.get(&id).unwrap().identity.is_none());
        table.authenticate(&id, alice()).unwrap();
        table.authenticate(&id, alice()).unwrap();
        assert_eq!(table.get(&id).unwrap().identity, Some(alice()));
    }

    #[test]
    fn test_authenticate_unknown_connection() {
        let table = ConnectionTable::new(10);
        assert!(matches!(
            table.authenticate(&ConnectionId::from("nope"), alice()),
            Err(Error::Unauthenticated(_))
        ));
    }

    #[test]
    fn test_connection_limit() {
        let table = ConnectionTable::new(1);
        let (tx1, _rx1) = sender();
        let (tx2, _rx2) = sender();
        table.register(ConnectionId::from("c1"), tx1).unwrap();

        assert!(matches!(
            table.register(ConnectionId::from("c2"), tx2),
            Err(Error::ConnectionLimit(1))
        ));
        assert_eq!(table.connection_count(), 1);
    }

    #[test]
    fn test_take_room_runs_once() {
        let table = ConnectionTable::new(10);
        let id = ConnectionId::from("c1");
        let (tx, _rx) = sender();
        table.register(id.clone(), tx).unwrap();
        table
            .set_room(&id, Some(RoomSeat::new(RoomId::from("r1"), true)))
            .unwrap();

        let seat = table.take_room(&id).unwrap();
        assert!(seat.is_streamer);
        assert!(table.take_room(&id).is_none());
        assert!(table.get(&id).unwrap().room.is_none());
    }

    #[test]
    fn test_find_by_identity_and_remove() {
        let table = ConnectionTable::new(10);
        for name in ["c1", "c2", "c3"] {
            let (tx, _rx) = sender();
            table.register(ConnectionId::from(name), tx).unwrap();
        }
        table.authenticate(&ConnectionId::from("c1"), alice()).unwrap();
        table.authenticate(&ConnectionId::from("c3"), alice()).unwrap();

        assert_eq!(table.find_by_identity(&UserId::from("alice")).len(), 2);
        table.remove(&ConnectionId::from("c1")).unwrap();
        assert_eq!(table.find_by_identity(&UserId::from("alice")).len(), 1);
        assert!(table.remove(&ConnectionId::from("c1")).is_err());
    }

    #[test]
    fn test_delivery_errors() {
        let (tx, rx) = sender();
        let frame: Arc<str> = Arc::from("{}");
        tx.try_deliver(frame.clone()).unwrap();
        tx.try_deliver(frame.clone()).unwrap();
        assert_eq!(tx.try_deliver(frame.clone()), Err(DeliveryError::Full));

        drop(rx);
        assert_eq!(tx.try_deliver(frame), Err(DeliveryError::Closed));
    }

    #[test]
    fn test_metrics() {
        let table = ConnectionTable::new(10);
        let (tx1, _rx1) = sender();
        let (tx2, _rx2) = sender();
        let c1 = ConnectionId::from("c1");
        table.register(c1.clone(), tx1).unwrap();
        table.register(ConnectionId::from("c2"), tx2).unwrap();
        table.attach_guest(&c1, Identity::guest(None)).unwrap();
        table
            .set_room(&c1, Some(RoomSeat::new(RoomId::from("r1"), false)))
            .unwrap();
        table.record_message(&c1);
        table.record_message(&c1);

        let metrics = table.metrics();
        assert_eq!(metrics.active_connections, 2);
        assert_eq!(metrics.total_connections, 2);
        assert_eq!(metrics.total_messages, 2);
        assert_eq!(metrics.authenticated, 1);
        assert_eq!(metrics.in_room, 1);
        assert!(table.get(&c1).unwrap().is_guest);
    }
}
