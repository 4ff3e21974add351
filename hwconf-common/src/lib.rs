//! # hwconf common library
//!
//! Shared code for the hardware-configuration tooling:
//! - Error type shared by every store operation
//! - Configuration loading (CLI / environment / TOML / defaults)
//! - Database models, schema creation and queries
//! - Store contracts consumed by the import pipeline
//! - Read-through atomic type cache

pub mod atomic_cache;
pub mod config;
pub mod db;
pub mod error;
pub mod store;

pub use atomic_cache::{AtomicTypeCache, CacheScope, ScopeState};
pub use error::{Error, Result};
pub use store::{AtomicSource, PackageCatalog, SessionWriter};
