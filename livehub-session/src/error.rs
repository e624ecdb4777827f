//! Error types for session state

use livehub_core::models::{ConnectionId, RoomId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Connection {0} is not registered")]
    Unauthenticated(ConnectionId),

    #[error("Connection not found: {0}")]
    ConnectionNotFound(ConnectionId),

    #[error("Server at capacity ({0} connections)")]
    ConnectionLimit(usize),

    #[error("Room {0} is full")]
    RoomFull(RoomId),
}

/// Result type for session operations
pub type Result<T> = std::result::Result<T, Error>;
