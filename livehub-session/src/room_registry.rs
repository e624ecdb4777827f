use dashmap::DashMap;
use livehub_core::models::{ConnectionId, RoomId};
use std::collections::HashSet;
use tracing::debug;

use crate::{Error, Result};

/// Room id to member connection ids.
///
/// Each mutation runs under the owning shard lock, so concurrent joins and
/// leaves serialize per room and the returned count is the count right after
/// this call's own change.
pub struct RoomRegistry {
    rooms: DashMap<RoomId, HashSet<ConnectionId>>,
    max_per_room: usize,
}

impl RoomRegistry {
    #[must_use]
    pub fn new(max_per_room: usize) -> Self {
        Self {
            rooms: DashMap::new(),
            max_per_room,
        }
    }

    /// Add a member and return the room's member count.
    ///
    /// Joining again is a no-op. A new member is refused once the room holds
    /// `max_per_room` connections.
    pub fn join(&self, room_id: &RoomId, connection_id: &ConnectionId) -> Result<usize> {
        let mut members = self.rooms.entry(room_id.clone()).or_default();
        if !members.contains(connection_id) {
            if members.len() >= self.max_per_room {
                let empty = members.is_empty();
                drop(members);
                if empty {
                    self.rooms.remove_if(room_id, |_, m| m.is_empty());
                }
                return Err(Error::RoomFull(room_id.clone()));
            }
            members.insert(connection_id.clone());
            debug!(
                room_id = %room_id,
                connection_id = %connection_id,
                members = members.len(),
                "Connection joined room"
            );
        }
        Ok(members.len())
    }

    /// Remove a member and return the remaining count.
    ///
    /// Removing the last member deletes the room entry.
    pub fn leave(&self, room_id: &RoomId, connection_id: &ConnectionId) -> usize {
        let remaining = match self.rooms.get_mut(room_id) {
            Some(mut members) => {
                members.remove(connection_id);
                members.len()
            }
            None => return 0,
        };

        if remaining == 0 && self.rooms.remove_if(room_id, |_, m| m.is_empty()).is_some() {
            debug!(room_id = %room_id, "Room has no more members, removed");
        }
        remaining
    }

    #[must_use]
    pub fn member_ids(&self, room_id: &RoomId) -> Vec<ConnectionId> {
        self.rooms
            .get(room_id)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn member_count(&self, room_id: &RoomId) -> usize {
        self.rooms.get(room_id).map_or(0, |members| members.len())
    }

    #[must_use]
    pub fn is_member(&self, room_id: &RoomId, connection_id: &ConnectionId) -> bool {
        self.rooms
            .get(room_id)
            .is_some_and(|members| members.contains(connection_id))
    }

    /// Number of rooms with at least one member
    #[must_use]
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
