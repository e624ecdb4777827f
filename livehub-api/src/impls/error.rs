//! Failure taxonomy of the session handlers
//!
//! Every variant becomes exactly one private reply to the acting client.
//! Nothing here is ever broadcast.

use livehub_session::{ErrorCode, ServerEvent};
use thiserror::Error;

use crate::protocol::DecodeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolFault {
    UnknownCommand,
    InvalidPayload,
}

/// Precondition a command was missing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denied {
    NotAuthenticated,
    NotInRoom,
    /// Carries the attempted action, e.g. "create polls"
    NotStreamer(&'static str),
    SignInRequired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    Room,
    Poll,
    Recipient,
    GiftType,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HubError {
    #[error("{}", protocol_message(.0))]
    Protocol(ProtocolFault),

    #[error("{0}")]
    Auth(String),

    #[error("{}", denied_message(.0))]
    Authorization(Denied),

    #[error("{}", missing_message(.0))]
    NotFound(Missing),

    #[error("Stream is full")]
    RoomFull,

    #[error("Poll has expired")]
    PollExpired,

    #[error("{0}")]
    Validation(String),

    /// Advisory: the in-memory effect and any broadcast already happened
    #[error("{0}")]
    Storage(String),
}

const fn protocol_message(fault: &ProtocolFault) -> &'static str {
    match fault {
        ProtocolFault::UnknownCommand => "Unknown message type",
        ProtocolFault::InvalidPayload => "Invalid message format",
    }
}

fn denied_message(denied: &Denied) -> String {
    match denied {
        Denied::NotAuthenticated => "Not authenticated".to_string(),
        Denied::NotInRoom => "Not in a stream".to_string(),
        Denied::NotStreamer(action) => format!("Only streamers can {action}"),
        Denied::SignInRequired => "Please sign in to send gifts".to_string(),
    }
}

const fn missing_message(missing: &Missing) -> &'static str {
    match missing {
        Missing::Room => "Stream not found or not live",
        Missing::Poll => "Poll not found or not active",
        Missing::Recipient => "Recipient not found",
        Missing::GiftType => "Invalid gift type",
    }
}

impl HubError {
    pub const UNKNOWN_COMMAND: Self = Self::Protocol(ProtocolFault::UnknownCommand);
    pub const INVALID_PAYLOAD: Self = Self::Protocol(ProtocolFault::InvalidPayload);
    pub const NOT_AUTHENTICATED: Self = Self::Authorization(Denied::NotAuthenticated);
    pub const NOT_IN_ROOM: Self = Self::Authorization(Denied::NotInRoom);

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Stable code carried by the `error` reply
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Protocol(ProtocolFault::UnknownCommand) => ErrorCode::UnknownCommand,
            Self::Protocol(ProtocolFault::InvalidPayload) => ErrorCode::InvalidPayload,
            // Sent as `auth_error`, which has no code; kept for metrics
            Self::Auth(_) | Self::Authorization(Denied::NotAuthenticated) => {
                ErrorCode::NotAuthenticated
            }
            Self::Authorization(Denied::NotInRoom) => ErrorCode::NotInRoom,
            Self::Authorization(Denied::NotStreamer(_)) => ErrorCode::NotStreamer,
            Self::Authorization(Denied::SignInRequired) => ErrorCode::SignInRequired,
            Self::NotFound(Missing::Room) => ErrorCode::RoomNotFound,
            Self::NotFound(Missing::Poll) => ErrorCode::PollNotFound,
            Self::NotFound(Missing::Recipient) => ErrorCode::RecipientNotFound,
            Self::NotFound(Missing::GiftType) => ErrorCode::GiftTypeNotFound,
            Self::RoomFull => ErrorCode::RoomFull,
            Self::PollExpired => ErrorCode::PollExpired,
            Self::Validation(_) => ErrorCode::Validation,
            Self::Storage(_) => ErrorCode::Storage,
        }
    }

    /// The reply sent to the acting client
    #[must_use]
    pub fn to_event(&self) -> ServerEvent {
        match self {
            Self::Auth(message) => ServerEvent::AuthError {
                message: message.clone(),
            },
            other => ServerEvent::error(other.code(), other.to_string()),
        }
    }
}

impl From<DecodeError> for HubError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::UnknownCommand(_) => Self::UNKNOWN_COMMAND,
            DecodeError::InvalidPayload(_) => Self::INVALID_PAYLOAD,
        }
    }
}

impl From<livehub_session::Error> for HubError {
    fn from(err: livehub_session::Error) -> Self {
        match err {
            livehub_session::Error::RoomFull(_) | livehub_session::Error::ConnectionLimit(_) => {
                Self::RoomFull
            }
            livehub_session::Error::Unauthenticated(_)
            | livehub_session::Error::ConnectionNotFound(_) => Self::NOT_AUTHENTICATED,
        }
    }
}

/// Field-level rejections from the domain model keep their message
impl From<livehub_core::Error> for HubError {
    fn from(err: livehub_core::Error) -> Self {
        match err {
            livehub_core::Error::InvalidInput(message) => Self::Validation(message),
            other if other.is_storage() => Self::storage("Storage unavailable"),
            other => Self::Validation(other.to_string()),
        }
    }
}

pub type HubResult<T> = std::result::Result<T, HubError>;
