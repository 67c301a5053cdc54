//! Authoritative in-memory collection of talks.
//!
//! [`ResourceStore`] owns every [`Talk`] together with a version counter
//! that advances by exactly one per successful mutation. Read-only calls
//! and rejected mutations leave the version untouched. The store knows
//! nothing about waiters; [`AppState`](crate::state::AppState) wakes them
//! after each mutation that reports a change.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use skillshare_types::{Comment, Talk};

/// Errors produced by store operations and request body decoding.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The body could not be parsed as JSON at all.
    #[error("invalid JSON: {0}")]
    MalformedBody(String),

    /// The body parsed but a required field was missing, had the wrong
    /// type, or was empty.
    #[error("{0}")]
    Validation(String),

    /// The operation needs a talk that does not exist.
    #[error("No talk '{0}' found")]
    NotFound(String),
}

/// Decode a JSON request body into `T`.
///
/// Bytes that are not JSON yield [`StoreError::MalformedBody`]; JSON of
/// the wrong shape (not an object, missing field, non-string value) yields
/// [`StoreError::Validation`].
pub fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, StoreError> {
    let value: serde_json::Value =
        serde_json::from_slice(body).map_err(|e| StoreError::MalformedBody(e.to_string()))?;
    if !value.is_object() {
        return Err(StoreError::Validation(String::from("expected a JSON object")));
    }
    serde_json::from_value(value).map_err(|e| StoreError::Validation(e.to_string()))
}

/// Reject empty required string fields.
fn require_non_empty(field: &str, value: &str) -> Result<(), StoreError> {
    if value.is_empty() {
        Err(StoreError::Validation(format!("'{field}' must not be empty")))
    } else {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// The full talk collection at one version.
///
/// Snapshots are cheap to clone so the same one can be handed to every
/// pending waiter when a change is published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Store version this snapshot was taken at.
    pub version: u64,
    /// All talks, ordered by title.
    pub talks: Arc<Vec<Talk>>,
}

impl Snapshot {
    /// The `ETag` header value for this snapshot, e.g. `"5"`.
    pub fn etag(&self) -> String {
        format!("\"{}\"", self.version)
    }
}

// ---------------------------------------------------------------------------
// ResourceStore
// ---------------------------------------------------------------------------

/// In-memory talk collection plus its version counter.
#[derive(Debug, Default)]
pub struct ResourceStore {
    talks: BTreeMap<String, Talk>,
    version: u64,
}

impl ResourceStore {
    /// Create an empty store at version 0.
    pub const fn new() -> Self {
        Self {
            talks: BTreeMap::new(),
            version: 0,
        }
    }

    /// Current version.
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Whether the store holds no talks.
    pub fn is_empty(&self) -> bool {
        self.talks.is_empty()
    }

    /// Look up a single talk.
    pub fn get(&self, title: &str) -> Result<&Talk, StoreError> {
        self.talks
            .get(title)
            .ok_or_else(|| StoreError::NotFound(title.to_owned()))
    }

    /// Take a snapshot of every talk paired with the current version.
    pub fn list(&self) -> Snapshot {
        Snapshot {
            version: self.version,
            talks: Arc::new(self.talks.values().cloned().collect()),
        }
    }

    /// Create or fully replace a talk.
    ///
    /// Replacing an existing talk discards its comments.
    pub fn put(
        &mut self,
        title: &str,
        presenter: &str,
        summary: &str,
    ) -> Result<&Talk, StoreError> {
        require_non_empty("presenter", presenter)?;
        require_non_empty("summary", summary)?;

        let talk = Talk::new(title.to_owned(), presenter.to_owned(), summary.to_owned());
        self.bump();
        let slot = match self.talks.entry(title.to_owned()) {
            Entry::Occupied(mut entry) => {
                entry.insert(talk);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(talk),
        };
        Ok(slot)
    }

    /// Delete a talk. Deleting a missing title is not an error.
    ///
    /// Returns `true` if a talk was actually removed (and the version
    /// advanced).
    pub fn delete(&mut self, title: &str) -> bool {
        let existed = self.talks.remove(title).is_some();
        if existed {
            self.bump();
        }
        existed
    }

    /// Append a comment to an existing talk.
    pub fn add_comment(
        &mut self,
        title: &str,
        author: &str,
        message: &str,
    ) -> Result<(), StoreError> {
        let talk = self
            .talks
            .get_mut(title)
            .ok_or_else(|| StoreError::NotFound(title.to_owned()))?;
        require_non_empty("author", author)?;
        require_non_empty("message", message)?;

        talk.comments.push(Comment {
            author: author.to_owned(),
            message: message.to_owned(),
        });
        self.bump();
        Ok(())
    }

    /// Advance the version after a successful mutation.
    const fn bump(&mut self) {
        self.version = self.version.saturating_add(1);
    }
}
