//! Client-to-hub wire protocol
//!
//! Every inbound frame is a JSON object discriminated by `type`. Decoding
//! happens once, here; handlers only ever see a typed [`ClientCommand`].

use livehub_core::models::{ReactionAction, RoomId, UserId};
use serde::Deserialize;
use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Every `type` the hub understands
pub const COMMAND_TYPES: [&str; 15] = [
    "authenticate",
    "join_stream",
    "join_stream_guest",
    "leave_stream",
    "chat_message",
    "chat_reaction",
    "create_poll",
    "vote_poll",
    "end_poll",
    "send_gift",
    "get_gift_types",
    "get_analytics",
    "webrtc_offer",
    "webrtc_answer",
    "webrtc_ice_candidate",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unknown message type {0:?}")]
    UnknownCommand(String),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

/// Signaling payload relayed without interpretation
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalEnvelope {
    pub target_user_id: UserId,
    /// Every other field the client sent
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl SignalEnvelope {
    /// The inbound fields as received, `targetUserId` included
    #[must_use]
    pub fn into_fields(self) -> Map<String, Value> {
        let mut fields = self.payload;
        fields.insert(
            "targetUserId".to_string(),
            Value::String(self.target_user_id.0),
        );
        fields
    }
}

fn default_gift_amount() -> Number {
    Number::from(1)
}

/// Commands sent by clients
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    Authenticate {
        #[serde(default)]
        token: Option<String>,
    },

    #[serde(rename_all = "camelCase")]
    JoinStream { stream_id: RoomId },

    #[serde(rename_all = "camelCase")]
    JoinStreamGuest {
        stream_id: RoomId,
        #[serde(default)]
        guest_username: Option<String>,
    },

    #[serde(rename_all = "camelCase")]
    LeaveStream {
        #[serde(default)]
        stream_id: Option<RoomId>,
    },

    ChatMessage {
        #[serde(default)]
        text: String,
    },

    #[serde(rename_all = "camelCase")]
    ChatReaction {
        #[serde(default)]
        message_id: String,
        #[serde(default)]
        emoji: String,
        action: ReactionAction,
    },

    #[serde(rename_all = "camelCase")]
    CreatePoll {
        #[serde(default)]
        question: String,
        #[serde(default)]
        options: Vec<String>,
        #[serde(default)]
        allow_multiple_votes: bool,
        /// Seconds until the poll closes
        #[serde(default)]
        duration: Option<u64>,
    },

    #[serde(rename_all = "camelCase")]
    VotePoll {
        poll_id: String,
        #[serde(default)]
        option_ids: Vec<String>,
    },

    #[serde(rename_all = "camelCase")]
    EndPoll { poll_id: String },

    #[serde(rename_all = "camelCase")]
    SendGift {
        #[serde(default)]
        gift_id: String,
        /// Range-checked by the gift handler so a bad quantity is a validation error
        #[serde(default = "default_gift_amount")]
        amount: Number,
        #[serde(default)]
        recipient_id: Option<UserId>,
        #[serde(default)]
        gift_message: Option<String>,
        #[serde(default)]
        is_anonymous: bool,
    },

    GetGiftTypes,

    GetAnalytics,

    WebrtcOffer(SignalEnvelope),

    WebrtcAnswer(SignalEnvelope),

    WebrtcIceCandidate(SignalEnvelope),
}

impl ClientCommand {
    /// Decode one text frame.
    ///
    /// A frame that is not an object with a string `type` is an invalid
    /// payload; a well-formed frame with an unrecognized `type` is an
    /// unknown command.
    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|err| DecodeError::InvalidPayload(err.to_string()))?;

        let kind = value
            .as_object()
            .and_then(|object| object.get("type"))
            .and_then(Value::as_str)
            .ok_or_else(|| DecodeError::InvalidPayload("missing message type".to_string()))?;

        if !COMMAND_TYPES.contains(&kind) {
            return Err(DecodeError::UnknownCommand(kind.to_string()));
        }

        serde_json::from_value(value).map_err(|err| DecodeError::InvalidPayload(err.to_string()))
    }

    /// Wire name of the command, used as a metrics label
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Authenticate { .. } => "authenticate",
            Self::JoinStream { .. } => "join_stream",
            Self::JoinStreamGuest { .. } => "join_stream_guest",
            Self::LeaveStream { .. } => "leave_stream",
            Self::ChatMessage { .. } => "chat_message",
            Self::ChatReaction { .. } => "chat_reaction",
            Self::CreatePoll { .. } => "create_poll",
            Self::VotePoll { .. } => "vote_poll",
            Self::EndPoll { .. } => "end_poll",
            Self::SendGift { .. } => "send_gift",
            Self::GetGiftTypes => "get_gift_types",
            Self::GetAnalytics => "get_analytics",
            Self::WebrtcOffer(_) => "webrtc_offer",
            Self::WebrtcAnswer(_) => "webrtc_answer",
            Self::WebrtcIceCandidate(_) => "webrtc_ice_candidate",
        }
    }
}
