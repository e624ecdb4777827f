//! Room session handlers, one module per command family

mod analytics;
mod chat;
mod gift;
mod poll;
mod session;
mod signaling;

pub(crate) use gift::GiftRequest;
pub(crate) use poll::PollRequest;
pub(crate) use signaling::SignalKind;
