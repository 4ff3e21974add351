//! Database models and queries

pub mod atomics;
pub mod endpoints;
pub mod init;
pub mod models;
pub mod packages;
pub mod retry;
pub mod sessions;
pub mod store;

pub use init::*;
pub use models::*;
pub use retry::retry_on_lock;
pub use store::SqliteStore;
