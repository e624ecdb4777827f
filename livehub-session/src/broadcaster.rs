use livehub_core::models::{ConnectionId, RoomId};
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::{ConnectionTable, RoomRegistry, ServerEvent};

/// Outcome of one fan-out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Delivers events to room members through their outbound queues.
///
/// A recipient whose queue is full or closed misses the event; the others
/// are unaffected and nothing is retried.
#[derive(Clone)]
pub struct Broadcaster {
    registry: Arc<RoomRegistry>,
    connections: Arc<ConnectionTable>,
}

impl Broadcaster {
    #[must_use]
    pub const fn new(registry: Arc<RoomRegistry>, connections: Arc<ConnectionTable>) -> Self {
        Self {
            registry,
            connections,
        }
    }

    fn encode(event: &ServerEvent) -> Option<Arc<str>> {
        match serde_json::to_string(event) {
            Ok(json) => Some(Arc::from(json)),
            Err(err) => {
                error!(event_type = event.event_type(), error = %err, "Failed to encode event");
                None
            }
        }
    }

    /// Send to every member of the room, optionally skipping one connection
    pub fn to_room(
        &self,
        room_id: &RoomId,
        event: &ServerEvent,
        except: Option<&ConnectionId>,
    ) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        let Some(frame) = Self::encode(event) else {
            return report;
        };

        for member in self.registry.member_ids(room_id) {
            if except == Some(&member) {
                continue;
            }
            if self.deliver(&member, Arc::clone(&frame), event) {
                report.delivered += 1;
            } else {
                report.failed += 1;
            }
        }

        if report.delivered > 0 {
            debug!(
                room_id = %room_id,
                sent_count = report.delivered,
                event_type = event.event_type(),
                "Event broadcast complete"
            );
        }
        report
    }

    /// Send to a single connection
    pub fn to_connection(&self, connection_id: &ConnectionId, event: &ServerEvent) -> bool {
        Self::encode(event).is_some_and(|frame| self.deliver(connection_id, frame, event))
    }

    fn deliver(&self, connection_id: &ConnectionId, frame: Arc<str>, event: &ServerEvent) -> bool {
        let Some(sender) = self.connections.sender(connection_id) else {
            debug!(
                connection_id = %connection_id,
                event_type = event.event_type(),
                "Recipient already gone"
            );
            return false;
        };

        match sender.try_deliver(frame) {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    connection_id = %connection_id,
                    event_type = event.event_type(),
                    error = %err,
                    "Failed to send event to client"
                );
                false
            }
        }
    }
}
