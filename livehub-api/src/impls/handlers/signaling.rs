//! WebRTC signaling relay
//!
//! Offers, answers and ICE candidates are opaque to the hub. Each one is
//! tagged with the sender and fanned out to the rest of the room; clients
//! match `targetUserId` themselves.

use livehub_core::models::ConnectionId;
use livehub_session::{ServerEvent, SignalEcho};
use tracing::trace;

use crate::impls::error::HubResult;
use crate::impls::LiveHub;
use crate::protocol::SignalEnvelope;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SignalKind {
    Offer,
    Answer,
    IceCandidate,
}

impl SignalKind {
    fn into_event(self, echo: SignalEcho) -> ServerEvent {
        match self {
            Self::Offer => ServerEvent::WebrtcOffer(echo),
            Self::Answer => ServerEvent::WebrtcAnswer(echo),
            Self::IceCandidate => ServerEvent::WebrtcIceCandidate(echo),
        }
    }
}

impl LiveHub {
    pub(crate) fn relay_signal(
        &self,
        connection_id: &ConnectionId,
        kind: SignalKind,
        envelope: SignalEnvelope,
    ) -> HubResult<()> {
        let member = self.member(connection_id)?;

        trace!(
            room_id = %member.room_id,
            from = %member.identity.user_id,
            to = %envelope.target_user_id,
            ?kind,
            "Relaying signal"
        );
        let echo = SignalEcho::new(
            envelope.into_fields(),
            member.identity.user_id,
            member.identity.username,
        );
        self.broadcast(&member.room_id, &kind.into_event(echo), Some(connection_id));
        Ok(())
    }
}
