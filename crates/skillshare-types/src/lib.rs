//! Shared type definitions for the skill-sharing talk server.
//!
//! This crate is the single source of truth for the JSON documents that
//! travel between the server and the browser client. Types defined here
//! flow downstream to `TypeScript` via `ts-rs`.
//!
//! # Modules
//!
//! - [`structs`] -- Talks, comments, and the talk submission body

pub mod structs;

// Re-export all public types at crate root for convenience.
pub use structs::{Comment, Talk, TalkSubmission};
