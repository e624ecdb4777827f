//! Authentication and room membership

use livehub_core::models::{ActivityEvent, ConnectionId, Identity, LiveRoomRecord, RoomId};
use livehub_session::{RoomSeat, ServerEvent};
use tracing::{debug, info, warn};

use crate::impls::error::{HubError, HubResult, Missing};
use crate::impls::LiveHub;

fn clamp_count(count: usize) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

impl LiveHub {
    pub(crate) async fn authenticate(
        &self,
        connection_id: &ConnectionId,
        token: Option<&str>,
    ) -> HubResult<()> {
        let token = token
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| HubError::Auth("Token required".to_string()))?;

        let identity = self.verifier.verify(token).await.map_err(|err| {
            debug!(connection_id = %connection_id, error = %err, "Token rejected");
            HubError::Auth("Invalid token".to_string())
        })?;

        // A different identity must not inherit the old one's room seat
        let previous = self.connections.get(connection_id)?.identity;
        if previous.is_some_and(|prev| prev.user_id != identity.user_id) {
            self.leave_current_room(connection_id).await?;
        }

        info!(
            connection_id = %connection_id,
            user_id = %identity.user_id,
            role = %identity.role,
            "Connection authenticated"
        );
        self.connections.authenticate(connection_id, identity)?;
        self.send_to(
            connection_id,
            &ServerEvent::Authenticated {
                client_id: connection_id.clone(),
            },
        );
        Ok(())
    }

    pub(crate) async fn join_stream(
        &self,
        connection_id: &ConnectionId,
        room_id: RoomId,
    ) -> HubResult<()> {
        let conn = self.connections.get(connection_id)?;
        let identity = conn.identity.ok_or(HubError::NOT_AUTHENTICATED)?;
        let record = self.resolve_live_room(&room_id).await?;

        if conn.room.as_ref().is_some_and(|seat| seat.room_id == room_id) {
            self.send_to(
                connection_id,
                &ServerEvent::JoinedStream {
                    stream_id: room_id.clone(),
                    is_streamer: conn.room.is_some_and(|seat| seat.is_streamer),
                    member_count: self.registry.member_count(&room_id),
                    client_id: None,
                },
            );
            return Ok(());
        }

        let is_streamer = identity.user_id == record.owner_id;
        self.enter_room(connection_id, identity, &record, is_streamer, None)
            .await
    }

    pub(crate) async fn join_stream_as_guest(
        &self,
        connection_id: &ConnectionId,
        room_id: RoomId,
        guest_username: Option<&str>,
    ) -> HubResult<()> {
        let record = self.resolve_live_room(&room_id).await?;
        let guest = Identity::guest(guest_username);

        // Leave under the old identity before it is replaced
        let left = self.leave_current_room(connection_id).await;
        self.connections.attach_guest(connection_id, guest.clone())?;
        debug!(
            connection_id = %connection_id,
            guest_id = %guest.user_id,
            "Guest identity attached"
        );

        let joined = self
            .enter_room(
                connection_id,
                guest,
                &record,
                false,
                Some(connection_id.clone()),
            )
            .await;
        joined.and(left)
    }

    pub(crate) async fn leave_stream(&self, connection_id: &ConnectionId) -> HubResult<()> {
        self.leave_current_room(connection_id).await
    }

    /// Look the room up in persistence; it must exist and be live
    async fn resolve_live_room(&self, room_id: &RoomId) -> HubResult<LiveRoomRecord> {
        match self.store.find_live_room(room_id).await {
            Ok(Some(record)) => Ok(record),
            Ok(None) => Err(HubError::NotFound(Missing::Room)),
            Err(err) => {
                warn!(room_id = %room_id, error = %err, "Failed to resolve stream");
                Err(HubError::storage("Failed to join stream"))
            }
        }
    }

    /// Seat the connection in `record`'s room and announce it.
    ///
    /// A seat in any other room is given up first. A failed viewer-count
    /// write is reported to the joiner only after the join completed.
    async fn enter_room(
        &self,
        connection_id: &ConnectionId,
        identity: Identity,
        record: &LiveRoomRecord,
        is_streamer: bool,
        guest_client_id: Option<ConnectionId>,
    ) -> HubResult<()> {
        let room_id = &record.room_id;
        let left = self.leave_current_room(connection_id).await;

        let member_count = self.registry.join(room_id, connection_id)?;
        if let Err(err) = self
            .connections
            .set_room(connection_id, Some(RoomSeat::new(room_id.clone(), is_streamer)))
        {
            self.registry.leave(room_id, connection_id);
            return Err(err.into());
        }
        self.refresh_room_gauge();

        info!(
            connection_id = %connection_id,
            room_id = %room_id,
            user_id = %identity.user_id,
            is_streamer,
            member_count,
            "Joined stream"
        );

        let synced = self.sync_viewer_count(room_id).await;
        self.record_activity(
            room_id,
            ActivityEvent::ViewerJoined {
                current_viewers: clamp_count(member_count),
            },
        )
        .await;

        self.broadcast(
            room_id,
            &ServerEvent::UserJoined {
                user_id: identity.user_id,
                username: identity.username,
                member_count,
                viewer_count: member_count,
            },
            Some(connection_id),
        );
        self.send_to(
            connection_id,
            &ServerEvent::JoinedStream {
                stream_id: room_id.clone(),
                is_streamer,
                member_count,
                client_id: guest_client_id,
            },
        );

        synced.and(left)
    }

    /// Give up the connection's seat, if it has one.
    ///
    /// Only the caller that actually takes the seat does the reconciliation,
    /// so concurrent or repeated leaves run it once.
    pub(crate) async fn leave_current_room(&self, connection_id: &ConnectionId) -> HubResult<()> {
        let identity = self
            .connections
            .get(connection_id)
            .ok()
            .and_then(|conn| conn.identity);
        let Some(seat) = self.connections.take_room(connection_id) else {
            return Ok(());
        };

        let room_id = seat.room_id;
        let remaining = self.registry.leave(&room_id, connection_id);
        if remaining == 0 {
            self.polls.clear_room(&room_id);
        }
        self.refresh_room_gauge();

        info!(
            connection_id = %connection_id,
            room_id = %room_id,
            remaining,
            "Left stream"
        );

        let synced = self.sync_viewer_count(&room_id).await;
        self.record_activity(
            &room_id,
            ActivityEvent::ViewerLeft {
                current_viewers: clamp_count(remaining),
                watched: seat.joined_at.elapsed(),
            },
        )
        .await;

        if let Some(identity) = identity {
            self.broadcast(
                &room_id,
                &ServerEvent::UserLeft {
                    user_id: identity.user_id,
                    username: identity.username,
                    member_count: remaining,
                    viewer_count: remaining,
                },
                None,
            );
        }
        synced
    }

    /// Persist the member count as it stands now, never a delta
    async fn sync_viewer_count(&self, room_id: &RoomId) -> HubResult<()> {
        let count = clamp_count(self.registry.member_count(room_id));
        self.store
            .set_viewer_count(room_id, count)
            .await
            .map_err(|err| {
                warn!(room_id = %room_id, count, error = %err, "Failed to update viewer count");
                HubError::storage("Failed to update viewer count")
            })
    }
}
