//! The explicitly constructed session hub
//!
//! `LiveHub` owns the room registry, connection table and active-poll board,
//! and holds handles to the persistence and identity collaborators. The
//! transport layer calls [`LiveHub::connect`], feeds each inbound text frame
//! to [`LiveHub::handle_text`] in order, and finishes with
//! [`LiveHub::disconnect`].

use livehub_core::{
    config::HubConfig,
    models::{ActivityEvent, ConnectionId, Identity, Poll, RoomId},
    repository::HubStore,
    service::IdentityVerifier,
};
use livehub_session::{
    Broadcaster, ConnectionMetrics, ConnectionTable, OutboundSender, PollBoard, RoomRegistry,
    ServerEvent,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::error::{Denied, HubError, HubResult};
use super::handlers::{GiftRequest, PollRequest, SignalKind};
use crate::observability::metrics::{
    BROADCAST_FAILURES_TOTAL, COMMANDS_TOTAL, COMMAND_ERRORS_TOTAL, CONNECTIONS_ACTIVE,
    CONNECTIONS_TOTAL, ROOMS_ACTIVE,
};
use crate::protocol::ClientCommand;

/// The caller's standing in its current room
#[derive(Debug, Clone)]
pub(crate) struct Member {
    pub identity: Identity,
    pub room_id: RoomId,
    pub is_streamer: bool,
    pub is_guest: bool,
}

pub struct LiveHub {
    pub(crate) connections: Arc<ConnectionTable>,
    pub(crate) registry: Arc<RoomRegistry>,
    pub(crate) broadcaster: Broadcaster,
    pub(crate) polls: PollBoard,
    pub(crate) store: Arc<dyn HubStore>,
    pub(crate) verifier: Arc<dyn IdentityVerifier>,
    outbound_buffer: usize,
}

impl LiveHub {
    #[must_use]
    pub fn new(
        config: &HubConfig,
        store: Arc<dyn HubStore>,
        verifier: Arc<dyn IdentityVerifier>,
    ) -> Self {
        let connections = Arc::new(ConnectionTable::new(config.max_connections));
        let registry = Arc::new(RoomRegistry::new(config.max_per_room));
        let broadcaster = Broadcaster::new(Arc::clone(&registry), Arc::clone(&connections));

        Self {
            connections,
            registry,
            broadcaster,
            polls: PollBoard::new(),
            store,
            verifier,
            outbound_buffer: config.outbound_buffer.max(1),
        }
    }

    /// Register a new transport session.
    ///
    /// Returns its id and the receiving end of its outbound queue.
    pub fn connect(&self) -> livehub_session::Result<(ConnectionId, mpsc::Receiver<Arc<str>>)> {
        let (tx, rx) = mpsc::channel(self.outbound_buffer);
        let connection_id = ConnectionId::new();
        self.connections
            .register(connection_id.clone(), OutboundSender::new(tx))?;

        CONNECTIONS_ACTIVE.inc();
        CONNECTIONS_TOTAL.inc();
        Ok((connection_id, rx))
    }

    /// Decode and handle one inbound text frame.
    ///
    /// Failures become a private reply; nothing propagates to the caller.
    pub async fn handle_text(&self, connection_id: &ConnectionId, text: &str) {
        self.connections.record_message(connection_id);

        let result = match ClientCommand::decode(text) {
            Ok(command) => {
                COMMANDS_TOTAL.with_label_values(&[command.name()]).inc();
                self.dispatch(connection_id, command).await
            }
            Err(err) => {
                debug!(connection_id = %connection_id, error = %err, "Rejected inbound frame");
                Err(err.into())
            }
        };

        if let Err(err) = result {
            self.reject(connection_id, &err);
        }
    }

    /// Binary frames are not part of the protocol
    pub fn handle_binary(&self, connection_id: &ConnectionId) {
        self.connections.record_message(connection_id);
        self.reject(connection_id, &HubError::INVALID_PAYLOAD);
    }

    /// Route a decoded command to its handler
    pub async fn dispatch(
        &self,
        connection_id: &ConnectionId,
        command: ClientCommand,
    ) -> HubResult<()> {
        match command {
            ClientCommand::Authenticate { token } => {
                self.authenticate(connection_id, token.as_deref()).await
            }
            ClientCommand::JoinStream { stream_id } => {
                self.join_stream(connection_id, stream_id).await
            }
            ClientCommand::JoinStreamGuest {
                stream_id,
                guest_username,
            } => {
                self.join_stream_as_guest(connection_id, stream_id, guest_username.as_deref())
                    .await
            }
            ClientCommand::LeaveStream { .. } => self.leave_stream(connection_id).await,
            ClientCommand::ChatMessage { text } => self.post_chat_message(connection_id, &text).await,
            ClientCommand::ChatReaction {
                message_id,
                emoji,
                action,
            } => self.react(connection_id, &message_id, &emoji, action).await,
            ClientCommand::CreatePoll {
                question,
                options,
                allow_multiple_votes,
                duration,
            } => {
                let request = PollRequest {
                    question,
                    options,
                    allow_multiple_votes,
                    duration_seconds: duration,
                };
                self.create_poll(connection_id, request).await
            }
            ClientCommand::VotePoll {
                poll_id,
                option_ids,
            } => self.vote_poll(connection_id, &poll_id, &option_ids).await,
            ClientCommand::EndPoll { poll_id } => self.end_poll(connection_id, &poll_id).await,
            ClientCommand::SendGift {
                gift_id,
                amount,
                recipient_id,
                gift_message,
                is_anonymous,
            } => {
                let request = GiftRequest {
                    gift_id,
                    amount,
                    recipient_id,
                    message: gift_message,
                    is_anonymous,
                };
                self.send_gift(connection_id, request).await
            }
            ClientCommand::GetGiftTypes => self.send_gift_types(connection_id).await,
            ClientCommand::GetAnalytics => self.send_analytics(connection_id).await,
            ClientCommand::WebrtcOffer(envelope) => {
                self.relay_signal(connection_id, SignalKind::Offer, envelope)
            }
            ClientCommand::WebrtcAnswer(envelope) => {
                self.relay_signal(connection_id, SignalKind::Answer, envelope)
            }
            ClientCommand::WebrtcIceCandidate(envelope) => {
                self.relay_signal(connection_id, SignalKind::IceCandidate, envelope)
            }
        }
    }

    /// Leave the current room, then forget the connection.
    ///
    /// Calling this again for the same connection does nothing.
    pub async fn disconnect(&self, connection_id: &ConnectionId) {
        if let Err(err) = self.leave_current_room(connection_id).await {
            debug!(
                connection_id = %connection_id,
                error = %err,
                "Leave on disconnect completed with a storage error"
            );
        }

        if self.connections.remove(connection_id).is_ok() {
            CONNECTIONS_ACTIVE.dec();
        }
    }

    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.connection_count()
    }

    #[must_use]
    pub fn room_count(&self) -> usize {
        self.registry.room_count()
    }

    #[must_use]
    pub fn member_count(&self, room_id: &RoomId) -> usize {
        self.registry.member_count(room_id)
    }

    #[must_use]
    pub fn connection_metrics(&self) -> ConnectionMetrics {
        self.connections.metrics()
    }

    /// Snapshot of the room's active poll, if any
    #[must_use]
    pub fn active_poll(&self, room_id: &RoomId) -> Option<Poll> {
        self.polls.active_poll(room_id)
    }

    /// Resolve the caller's identity and room, or `NotInRoom`
    pub(crate) fn member(&self, connection_id: &ConnectionId) -> HubResult<Member> {
        let conn = self.connections.get(connection_id)?;
        match (conn.identity, conn.room) {
            (Some(identity), Some(seat)) => Ok(Member {
                identity,
                room_id: seat.room_id,
                is_streamer: seat.is_streamer,
                is_guest: conn.is_guest,
            }),
            _ => Err(HubError::NOT_IN_ROOM),
        }
    }

    /// Like [`Self::member`], but only the room's streamer passes
    pub(crate) fn streamer(
        &self,
        connection_id: &ConnectionId,
        action: &'static str,
    ) -> HubResult<Member> {
        let member = self.member(connection_id)?;
        if member.is_streamer {
            Ok(member)
        } else {
            Err(HubError::Authorization(Denied::NotStreamer(action)))
        }
    }

    pub(crate) fn reject(&self, connection_id: &ConnectionId, err: &HubError) {
        COMMAND_ERRORS_TOTAL
            .with_label_values(&[err.code().as_str()])
            .inc();
        self.send_to(connection_id, &err.to_event());
    }

    pub(crate) fn send_to(&self, connection_id: &ConnectionId, event: &ServerEvent) {
        if !self.broadcaster.to_connection(connection_id, event) {
            BROADCAST_FAILURES_TOTAL.inc();
        }
    }

    pub(crate) fn broadcast(
        &self,
        room_id: &RoomId,
        event: &ServerEvent,
        except: Option<&ConnectionId>,
    ) {
        let report = self.broadcaster.to_room(room_id, event, except);
        if report.failed > 0 {
            BROADCAST_FAILURES_TOTAL.inc_by(report.failed as u64);
        }
    }

    /// Analytics are best effort: failures are logged and never reach clients
    pub(crate) async fn record_activity(&self, room_id: &RoomId, event: ActivityEvent) {
        if let Err(err) = self.store.record_activity(room_id, event).await {
            warn!(
                room_id = %room_id,
                activity = event.name(),
                error = %err,
                "Failed to record analytics"
            );
        }
    }

    pub(crate) fn refresh_room_gauge(&self) {
        ROOMS_ACTIVE.set(i64::try_from(self.registry.room_count()).unwrap_or(i64::MAX));
    }
}
