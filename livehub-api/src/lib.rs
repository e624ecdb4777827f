// LiveHub API Library
//
// WebSocket protocol, session handlers and the HTTP surface of the hub

pub mod http;
pub mod impls;
pub mod observability;
pub mod protocol;

// Re-export commonly used types
pub use http::{create_router, AppState};
pub use impls::{HubError, LiveHub};
pub use protocol::ClientCommand;
