//! Gifts and the gift catalog

use livehub_core::models::{
    is_valid_amount, ActivityEvent, ConnectionId, GiftTransaction, Identity, RoomId, UserId,
    GIFT_MESSAGE_MAX_CHARS,
};
use livehub_session::ServerEvent;
use serde_json::Number;
use tracing::{info, warn};

use crate::impls::error::{Denied, HubError, HubResult, Missing};
use crate::impls::LiveHub;
use crate::observability::metrics::GIFT_VALUE_CENTS_TOTAL;

const INVALID_GIFT: &str = "Invalid gift data";

/// Gift fields as sent by the client
#[derive(Debug, Clone)]
pub(crate) struct GiftRequest {
    pub gift_id: String,
    pub amount: Number,
    pub recipient_id: Option<UserId>,
    pub message: Option<String>,
    pub is_anonymous: bool,
}

impl LiveHub {
    pub(crate) async fn send_gift(
        &self,
        connection_id: &ConnectionId,
        request: GiftRequest,
    ) -> HubResult<()> {
        let member = self.member(connection_id)?;
        if member.is_guest {
            return Err(HubError::Authorization(Denied::SignInRequired));
        }

        let recipient_id = request
            .recipient_id
            .filter(|id| !id.as_str().is_empty())
            .ok_or_else(|| HubError::validation(INVALID_GIFT))?;
        let amount = request
            .amount
            .as_u64()
            .and_then(|amount| u32::try_from(amount).ok())
            .filter(|amount| is_valid_amount(*amount))
            .ok_or_else(|| HubError::validation(INVALID_GIFT))?;
        if request.gift_id.is_empty() {
            return Err(HubError::validation(INVALID_GIFT));
        }
        let message = request.message.as_deref().map(str::trim).unwrap_or_default();
        if message.chars().count() > GIFT_MESSAGE_MAX_CHARS {
            return Err(HubError::validation(format!(
                "Gift message cannot exceed {GIFT_MESSAGE_MAX_CHARS} characters"
            )));
        }

        let catalog = self.store.gift_catalog().await.map_err(|err| {
            warn!(error = %err, "Failed to load gift catalog");
            HubError::storage("Failed to send gift")
        })?;
        let gift_type = catalog
            .into_iter()
            .find(|gift| gift.id == request.gift_id)
            .ok_or(HubError::NotFound(Missing::GiftType))?;

        let recipient = self
            .connected_member(&member.room_id, &recipient_id)
            .ok_or(HubError::NotFound(Missing::Recipient))?;

        let gift = GiftTransaction::new(
            member.room_id.clone(),
            member.identity.user_id,
            member.identity.username,
            recipient.user_id,
            recipient.username,
            gift_type,
            amount,
            message.to_string(),
            request.is_anonymous,
        );

        let persisted = self.store.record_gift(&gift).await.map_err(|err| {
            warn!(gift_id = %gift.id, error = %err, "Failed to persist gift");
            HubError::storage("Failed to send gift")
        });
        self.record_activity(
            &member.room_id,
            ActivityEvent::GiftSent {
                value: gift.total_value,
            },
        )
        .await;
        GIFT_VALUE_CENTS_TOTAL.inc_by(gift.total_value);

        info!(
            room_id = %member.room_id,
            gift_id = %gift.id,
            gift_type = %gift.gift_type.id,
            amount = gift.amount,
            total_value = gift.total_value,
            "Gift sent"
        );
        self.broadcast(
            &member.room_id,
            &ServerEvent::GiftSent {
                gift: gift.public_view(),
            },
            None,
        );
        self.send_to(
            connection_id,
            &ServerEvent::GiftSentConfirmation {
                gift_id: gift.id,
                total_value: gift.total_value,
            },
        );
        persisted
    }

    pub(crate) async fn send_gift_types(&self, connection_id: &ConnectionId) -> HubResult<()> {
        let gift_types = self.store.gift_catalog().await.map_err(|err| {
            warn!(error = %err, "Failed to load gift catalog");
            HubError::storage("Failed to get gift types")
        })?;
        self.send_to(connection_id, &ServerEvent::GiftTypes { gift_types });
        Ok(())
    }

    /// Identity of a connection in `room_id` that carries `user_id`
    fn connected_member(&self, room_id: &RoomId, user_id: &UserId) -> Option<Identity> {
        self.connections
            .find_by_identity(user_id)
            .into_iter()
            .filter(|conn| conn.room_id() == Some(room_id))
            .find_map(|conn| conn.identity)
    }
}
