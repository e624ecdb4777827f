//! Chat messages and reactions

use chrono::Utc;
use livehub_core::models::{
    is_allowed_reaction, ActivityEvent, ChatMessage, ChatReaction, ConnectionId, ReactionAction,
    CHAT_MESSAGE_MAX_CHARS,
};
use livehub_session::ServerEvent;
use tracing::warn;

use crate::impls::error::{HubError, HubResult};
use crate::impls::LiveHub;

impl LiveHub {
    /// Blank text is dropped without a reply
    pub(crate) async fn post_chat_message(
        &self,
        connection_id: &ConnectionId,
        text: &str,
    ) -> HubResult<()> {
        let member = self.member(connection_id)?;

        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }
        if text.chars().count() > CHAT_MESSAGE_MAX_CHARS {
            return Err(HubError::validation(format!(
                "Message cannot exceed {CHAT_MESSAGE_MAX_CHARS} characters"
            )));
        }

        let message = ChatMessage::new(
            member.room_id.clone(),
            member.identity.user_id,
            member.identity.username,
            text.to_string(),
        );

        let persisted = self.store.append_chat_message(&message).await.map_err(|err| {
            warn!(room_id = %member.room_id, error = %err, "Failed to persist chat message");
            HubError::storage("Failed to send message")
        });
        if persisted.is_ok() {
            self.record_activity(&member.room_id, ActivityEvent::MessagePosted)
                .await;
        }

        self.broadcast(
            &member.room_id,
            &ServerEvent::ChatMessage {
                id: message.id,
                user_id: message.user_id,
                username: message.username,
                message: message.message,
                timestamp: message.timestamp,
            },
            None,
        );
        persisted
    }

    /// Add or remove the caller's reaction, then broadcast the full grouping
    pub(crate) async fn react(
        &self,
        connection_id: &ConnectionId,
        message_id: &str,
        emoji: &str,
        action: ReactionAction,
    ) -> HubResult<()> {
        let member = self.member(connection_id)?;

        if message_id.trim().is_empty() {
            return Err(HubError::validation("Message id is required"));
        }
        if !is_allowed_reaction(emoji) {
            return Err(HubError::validation("Unsupported reaction"));
        }

        let changed = match action {
            ReactionAction::Add => {
                let reaction = ChatReaction {
                    message_id: message_id.to_string(),
                    room_id: member.room_id.clone(),
                    user_id: member.identity.user_id.clone(),
                    username: member.identity.username.clone(),
                    emoji: emoji.to_string(),
                    timestamp: Utc::now(),
                };
                let upserted = self.store.upsert_reaction(&reaction).await;
                if upserted.is_ok() {
                    self.record_activity(&member.room_id, ActivityEvent::ReactionAdded)
                        .await;
                }
                upserted.map(|()| true)
            }
            ReactionAction::Remove => {
                self.store
                    .delete_reaction(message_id, &member.identity.user_id, emoji)
                    .await
            }
        };
        let changed = changed.map_err(|err| {
            warn!(message_id, error = %err, "Failed to store reaction");
            HubError::storage("Failed to process reaction")
        });

        let reactions = self.store.group_reactions(message_id).await.map_err(|err| {
            warn!(message_id, error = %err, "Failed to group reactions");
            HubError::storage("Failed to process reaction")
        })?;

        self.broadcast(
            &member.room_id,
            &ServerEvent::ChatReactionUpdate {
                message_id: message_id.to_string(),
                reactions,
            },
            None,
        );
        changed.map(|_| ())
    }
}
