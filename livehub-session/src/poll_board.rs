use chrono::{DateTime, Utc};
use dashmap::{mapref::entry::Entry, DashMap};
use livehub_core::models::{Poll, RoomId, UserId};
use parking_lot::Mutex;
use std::sync::Arc;

/// Result of applying a vote to an active poll
#[derive(Debug)]
pub enum VoteOutcome {
    /// Vote applied; carries the post-vote snapshot and newly counted options
    Recorded { poll: Poll, voted: Vec<String> },
    /// The poll had expired and is now deactivated
    Expired(Poll),
    /// The selection was invalid; the poll is unchanged
    Rejected(livehub_core::Error),
}

/// The single active poll per room.
///
/// Each poll sits behind its own mutex so concurrent votes on one poll
/// serialize without blocking other rooms. Callers receive snapshots and
/// never hold the lock across I/O.
///
/// The id of the poll a room most recently closed is remembered so a
/// storage reload cannot reinstate it before its inactive state is written.
#[derive(Default)]
pub struct PollBoard {
    active: DashMap<RoomId, Arc<Mutex<Poll>>>,
    retired: DashMap<RoomId, String>,
}

impl PollBoard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `poll` the room's active poll, replacing any previous one
    pub fn install(&self, poll: Poll) {
        self.active
            .insert(poll.room_id.clone(), Arc::new(Mutex::new(poll)));
    }

    /// Install `poll` only when the room has no active poll yet.
    ///
    /// Used for polls reloaded from storage, which must not displace one
    /// created in the meantime.
    pub fn adopt(&self, poll: Poll) -> bool {
        let was_retired = self
            .retired
            .get(&poll.room_id)
            .is_some_and(|retired| *retired == poll.id);
        if was_retired || !poll.is_active {
            return false;
        }
        match self.active.entry(poll.room_id.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(Mutex::new(poll)));
                true
            }
        }
    }

    fn find(&self, room_id: &RoomId, poll_id: &str) -> Option<Arc<Mutex<Poll>>> {
        let slot = self.active.get(room_id).map(|slot| slot.value().clone())?;
        let matches = slot.lock().id == poll_id;
        matches.then_some(slot)
    }

    fn retire(&self, room_id: &RoomId, poll_id: &str) {
        self.retired.insert(room_id.clone(), poll_id.to_string());
        self.active
            .remove_if(room_id, |_, slot| slot.lock().id == poll_id);
    }

    /// Close the room's active poll ahead of a replacement.
    ///
    /// Returns the deactivated snapshot, whose version is above every vote
    /// snapshot taken before it, so persisting it wins over in-flight writes.
    pub fn retire_room(&self, room_id: &RoomId) -> Option<Poll> {
        let slot = self.active.get(room_id).map(|slot| slot.value().clone())?;
        let snapshot = {
            let mut poll = slot.lock();
            if !poll.is_active {
                return None;
            }
            poll.deactivate();
            poll.clone()
        };
        self.retire(room_id, &snapshot.id);
        Some(snapshot)
    }

    /// Whether the room's active poll has this id
    #[must_use]
    pub fn contains(&self, room_id: &RoomId, poll_id: &str) -> bool {
        self.find(room_id, poll_id).is_some()
    }

    /// Apply a vote. `None` when the room has no active poll with this id.
    pub fn vote(
        &self,
        room_id: &RoomId,
        poll_id: &str,
        voter: &UserId,
        option_ids: &[String],
        now: DateTime<Utc>,
    ) -> Option<VoteOutcome> {
        let slot = self.find(room_id, poll_id)?;
        let outcome = {
            let mut poll = slot.lock();
            if !poll.is_active {
                return None;
            }
            if poll.is_expired(now) {
                poll.deactivate();
                VoteOutcome::Expired(poll.clone())
            } else {
                match poll.cast_vote(voter, option_ids) {
                    Ok(voted) => VoteOutcome::Recorded {
                        poll: poll.clone(),
                        voted,
                    },
                    Err(err) => VoteOutcome::Rejected(err),
                }
            }
        };

        if matches!(outcome, VoteOutcome::Expired(_)) {
            self.retire(room_id, poll_id);
        }
        Some(outcome)
    }

    /// Deactivate the poll and return its final snapshot
    pub fn end(&self, room_id: &RoomId, poll_id: &str) -> Option<Poll> {
        let slot = self.find(room_id, poll_id)?;
        let snapshot = {
            let mut poll = slot.lock();
            if !poll.is_active {
                return None;
            }
            poll.deactivate();
            poll.clone()
        };
        self.retire(room_id, poll_id);
        Some(snapshot)
    }

    /// Forget the room's poll, e.g. when the room empties
    pub fn clear_room(&self, room_id: &RoomId) {
        self.active.remove(room_id);
        self.retired.remove(room_id);
    }

    #[must_use]
    pub fn active_poll(&self, room_id: &RoomId) -> Option<Poll> {
        self.active.get(room_id).map(|slot| slot.lock().clone())
    }
}
