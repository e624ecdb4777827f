use chrono::{DateTime, Utc};
use livehub_core::models::{
    ConnectionId, GiftType, GiftView, LiveAnalytics, PollView, ReactionGroup, RoomId, UserId,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Stable machine-readable code carried by `error` replies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    UnknownCommand,
    InvalidPayload,
    NotAuthenticated,
    NotInRoom,
    NotStreamer,
    SignInRequired,
    RoomNotFound,
    RoomFull,
    PollNotFound,
    PollExpired,
    RecipientNotFound,
    GiftTypeNotFound,
    Validation,
    Storage,
}

impl ErrorCode {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownCommand => "unknown_command",
            Self::InvalidPayload => "invalid_payload",
            Self::NotAuthenticated => "not_authenticated",
            Self::NotInRoom => "not_in_room",
            Self::NotStreamer => "not_streamer",
            Self::SignInRequired => "sign_in_required",
            Self::RoomNotFound => "room_not_found",
            Self::RoomFull => "room_full",
            Self::PollNotFound => "poll_not_found",
            Self::PollExpired => "poll_expired",
            Self::RecipientNotFound => "recipient_not_found",
            Self::GiftTypeNotFound => "gift_type_not_found",
            Self::Validation => "validation",
            Self::Storage => "storage",
        }
    }
}

/// Relayed signaling payload: the sender's fields verbatim plus who sent it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalEcho {
    #[serde(flatten)]
    pub payload: Map<String, Value>,
    pub from_user_id: UserId,
    pub from_username: String,
}

impl SignalEcho {
    /// Keys the hub owns are stripped from the payload before tagging it
    #[must_use]
    pub fn new(mut payload: Map<String, Value>, from_user_id: UserId, from_username: String) -> Self {
        for key in ["type", "fromUserId", "fromUsername"] {
            payload.remove(key);
        }
        Self {
            payload,
            from_user_id,
            from_username,
        }
    }
}

/// Messages sent from the hub to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    #[serde(rename_all = "camelCase")]
    Authenticated { client_id: ConnectionId },

    AuthError { message: String },

    #[serde(rename_all = "camelCase")]
    JoinedStream {
        stream_id: RoomId,
        is_streamer: bool,
        member_count: usize,
        /// Set for guest joins, which skip `authenticated`
        #[serde(skip_serializing_if = "Option::is_none", default)]
        client_id: Option<ConnectionId>,
    },

    #[serde(rename_all = "camelCase")]
    UserJoined {
        user_id: UserId,
        username: String,
        member_count: usize,
        viewer_count: usize,
    },

    #[serde(rename_all = "camelCase")]
    UserLeft {
        user_id: UserId,
        username: String,
        member_count: usize,
        viewer_count: usize,
    },

    #[serde(rename_all = "camelCase")]
    ChatMessage {
        id: String,
        user_id: UserId,
        username: String,
        message: String,
        timestamp: DateTime<Utc>,
    },

    #[serde(rename_all = "camelCase")]
    ChatReactionUpdate {
        message_id: String,
        reactions: Vec<ReactionGroup>,
    },

    PollCreated { poll: PollView },

    PollUpdated { poll: PollView },

    PollEnded { poll: PollView },

    #[serde(rename_all = "camelCase")]
    VoteRecorded {
        poll_id: String,
        voted_option_ids: Vec<String>,
        voted_options: Vec<String>,
    },

    GiftSent { gift: GiftView },

    #[serde(rename_all = "camelCase")]
    GiftSentConfirmation { gift_id: String, total_value: u64 },

    #[serde(rename_all = "camelCase")]
    GiftTypes { gift_types: Vec<GiftType> },

    AnalyticsData { analytics: LiveAnalytics },

    Error { message: String, code: ErrorCode },

    WebrtcOffer(SignalEcho),

    WebrtcAnswer(SignalEcho),

    WebrtcIceCandidate(SignalEcho),
}

impl ServerEvent {
    /// Get the event type as a string
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::Authenticated { .. } => "authenticated",
            Self::AuthError { .. } => "auth_error",
            Self::JoinedStream { .. } => "joined_stream",
            Self::UserJoined { .. } => "user_joined",
            Self::UserLeft { .. } => "user_left",
            Self::ChatMessage { .. } => "chat_message",
            Self::ChatReactionUpdate { .. } => "chat_reaction_update",
            Self::PollCreated { .. } => "poll_created",
            Self::PollUpdated { .. } => "poll_updated",
            Self::PollEnded { .. } => "poll_ended",
            Self::VoteRecorded { .. } => "vote_recorded",
            Self::GiftSent { .. } => "gift_sent",
            Self::GiftSentConfirmation { .. } => "gift_sent_confirmation",
            Self::GiftTypes { .. } => "gift_types",
            Self::AnalyticsData { .. } => "analytics_data",
            Self::Error { .. } => "error",
            Self::WebrtcOffer(_) => "webrtc_offer",
            Self::WebrtcAnswer(_) => "webrtc_answer",
            Self::WebrtcIceCandidate(_) => "webrtc_ice_candidate",
        }
    }

    #[must_use]
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            code,
        }
    }
}
