//! Offline-capable data layer for a multi-tenant invoicing application.
//!
//! The remote record service is the source of truth whenever it can be
//! reached; an embedded SQLite store mirrors it as a cache and holds the
//! durable queue of mutations made while it cannot. Reads try the remote
//! first and fall back to the cache on any failure; writes that cannot be
//! applied remotely are cached and queued, then replayed in order once
//! connectivity returns.
//!
//! [`state::AppState`] wires the whole layer; hosts feed it connectivity
//! signals through [`application::NetworkMonitor`].

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod shared;
pub mod state;

pub use shared::config::AppConfig;
pub use shared::error::{AppError, Result};
pub use state::AppState;
