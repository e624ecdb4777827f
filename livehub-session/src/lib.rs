//! In-memory real-time session state: rooms, connections and fan-out

pub mod broadcaster;
pub mod connection_table;
pub mod error;
pub mod events;
pub mod poll_board;
pub mod room_registry;

pub use broadcaster::{Broadcaster, DeliveryReport};
pub use connection_table::{
    Connection, ConnectionMetrics, ConnectionTable, DeliveryError, OutboundSender, RoomSeat,
};
pub use error::{Error, Result};
pub use events::{ErrorCode, ServerEvent, SignalEcho};
pub use poll_board::{PollBoard, VoteOutcome};
pub use room_registry::RoomRegistry;
