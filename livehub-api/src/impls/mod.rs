mod error;
mod handlers;
pub(crate) mod hub;

pub use error::{Denied, HubError, HubResult, Missing, ProtocolFault};
pub use hub::LiveHub;
