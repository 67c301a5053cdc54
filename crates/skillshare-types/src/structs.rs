//! Talk and comment records exchanged with skill-sharing clients.
//!
//! Field names match the JSON documents the browser client sends and
//! receives, so these structs serialize without renaming.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Talk
// ---------------------------------------------------------------------------

/// A proposed talk for the next meeting.
///
/// The title is the identity of the talk and doubles as the last path
/// segment of its resource URL (`/talks/{title}`). Titles are
/// case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Talk {
    /// Unique, case-sensitive title.
    pub title: String,
    /// Name of the person giving the talk.
    pub presenter: String,
    /// Short description of the talk.
    pub summary: String,
    /// Discussion thread, in the order comments were posted.
    pub comments: Vec<Comment>,
}

impl Talk {
    /// Build a talk with an empty comment thread.
    pub const fn new(title: String, presenter: String, summary: String) -> Self {
        Self {
            title,
            presenter,
            summary,
            comments: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Comment
// ---------------------------------------------------------------------------

/// A single comment on a talk.
///
/// Comments are append-only: once posted they are never edited or
/// reordered. This is also the body of `POST /talks/{title}/comments`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Comment {
    /// Who wrote the comment.
    pub author: String,
    /// The comment text.
    pub message: String,
}

// ---------------------------------------------------------------------------
// TalkSubmission
// ---------------------------------------------------------------------------

/// Body of `PUT /talks/{title}`.
///
/// The title comes from the URL, so the body only carries the presenter
/// and summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TalkSubmission {
    /// Name of the person giving the talk.
    pub presenter: String,
    /// Short description of the talk.
    pub summary: String,
}
