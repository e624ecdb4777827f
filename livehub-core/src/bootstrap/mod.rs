//! Startup helpers shared by the binary: configuration, database pool and store selection.

pub mod config;
pub mod database;
pub mod store;

pub use config::load_config;
pub use database::init_database;
pub use store::{init_store, StoreHandle};
