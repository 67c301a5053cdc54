//! Long-polling talk server for the skill-sharing website.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **Talk resources** under `/talks/{title}` (`GET`, `PUT`, `DELETE`)
//!   and their comment threads (`POST /talks/{title}/comments`)
//! - **The talk collection** at `GET /talks`, versioned with an `ETag`.
//!   Clients that already hold the current version can send
//!   `Prefer: wait=N` to be held until the next change or for `N`
//!   seconds (long polling)
//! - **Static files** for every other path, served from a configured
//!   root directory
//!
//! # Architecture
//!
//! [`state::AppState`] owns the [`store::ResourceStore`] and the
//! [`poll::LongPollCoordinator`] behind one lock. Every mutation bumps the
//! store version once and hands the new snapshot to all pending waiters,
//! so several changes between two polls coalesce into one full snapshot.
//! All state is in memory and lives as long as the server.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod poll;
pub mod router;
pub mod server;
pub mod state;
pub mod store;

// Re-export primary types for convenience.
pub use config::SkillShareConfig;
pub use error::ApiError;
pub use router::build_router;
pub use server::{ServerError, start_server};
pub use state::AppState;
pub use store::{ResourceStore, Snapshot, StoreError};
