//! Shared application state for the talk server.
//!
//! [`AppState`] is the single owner of the [`ResourceStore`] and the
//! [`LongPollCoordinator`]. Both live behind one mutex so that the version
//! check of a conditional GET, the registration of its waiter, every
//! mutation and the wake-up that follows it are serialised. Handlers only
//! see the narrow operations below, never the collections themselves.
//!
//! # Long-poll lifecycle
//!
//! [`AppState::poll`] classifies a collection GET:
//!
//! - client tag absent or different from the version: [`PollOutcome::Fresh`]
//! - tag matches, no wait requested: [`PollOutcome::NotModified`]
//! - tag matches, wait requested: [`PollOutcome::Waiting`] with a
//!   [`PendingPoll`] that resolves to [`PollResolution::Woken`] or
//!   [`PollResolution::TimedOut`], exactly once.
//!
//! Dropping a [`PendingPoll`] before it resolves (the client hung up)
//! removes its waiter immediately.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use skillshare_types::{Comment, Talk, TalkSubmission};
use tokio::sync::oneshot;
use tracing::debug;

use crate::config::PollConfig;
use crate::poll::{LongPollCoordinator, WaiterId};
use crate::store::{ResourceStore, Snapshot, StoreError};

/// What a client sent on `GET /talks`, reduced to what the decision needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollRequest {
    /// Versions listed in `If-None-Match`. Empty when the header is absent
    /// or carries no numeric tag.
    pub known_versions: Vec<u64>,
    /// Requested stall from `Prefer: wait=N`.
    pub wait: Option<Duration>,
}

/// Immediate classification of a collection GET.
#[derive(Debug)]
pub enum PollOutcome {
    /// The client is behind: respond with this snapshot now.
    Fresh(Snapshot),
    /// The client is current and did not ask to wait.
    NotModified,
    /// The client is current and asked to wait for a change.
    Waiting(PendingPoll),
}

/// Terminal state of a [`PendingPoll`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollResolution {
    /// A mutation happened before the deadline.
    Woken(Snapshot),
    /// The deadline passed (or the server released the waiter) first.
    TimedOut,
}

/// Store and waiter list, always locked together.
#[derive(Debug, Default)]
struct Hub {
    store: ResourceStore,
    coordinator: LongPollCoordinator,
    /// Set once waiters are released; no new waiter may register after.
    shutting_down: bool,
}

impl Hub {
    /// Publish the post-mutation snapshot to every pending waiter.
    fn publish(&mut self) {
        if self.coordinator.pending() == 0 {
            return;
        }
        let snapshot = self.store.list();
        let woken = self.coordinator.notify_all(&snapshot);
        debug!(version = snapshot.version, woken, "Woke long-poll waiters");
    }
}

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Debug)]
pub struct AppState {
    hub: Mutex<Hub>,
    poll_config: PollConfig,
    static_root: PathBuf,
}

impl AppState {
    /// Create a state with an empty store and default settings.
    pub fn new() -> Self {
        Self::with_config(PollConfig::default(), PathBuf::from("./public"))
    }

    /// Create a state with the given long-poll limits and static root.
    pub fn with_config(poll_config: PollConfig, static_root: PathBuf) -> Self {
        Self {
            hub: Mutex::new(Hub::default()),
            poll_config,
            static_root,
        }
    }

    /// Directory served for paths outside `/talks`.
    pub fn static_root(&self) -> &Path {
        &self.static_root
    }

    /// Lock the hub. A poisoned lock is recovered: every hub operation
    /// leaves the store consistent before it can panic.
    fn hub(&self) -> MutexGuard<'_, Hub> {
        self.hub.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Current store version.
    pub fn version(&self) -> u64 {
        self.hub().store.version()
    }

    /// A copy of one talk.
    pub fn talk(&self, title: &str) -> Result<Talk, StoreError> {
        self.hub().store.get(title).cloned()
    }

    /// Number of clients currently stalled on `GET /talks`.
    pub fn pending_waiters(&self) -> usize {
        self.hub().coordinator.pending()
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Create or replace a talk, then wake waiters.
    pub fn put_talk(&self, title: &str, submission: &TalkSubmission) -> Result<(), StoreError> {
        let mut hub = self.hub();
        hub.store.put(title, &submission.presenter, &submission.summary)?;
        debug!(title, version = hub.store.version(), "Talk stored");
        hub.publish();
        Ok(())
    }

    /// Delete a talk if present. Waiters are only woken when something was
    /// removed. Returns whether the talk existed.
    pub fn delete_talk(&self, title: &str) -> bool {
        let mut hub = self.hub();
        let existed = hub.store.delete(title);
        if existed {
            debug!(title, version = hub.store.version(), "Talk deleted");
            hub.publish();
        }
        existed
    }

    /// Append a comment to a talk, then wake waiters.
    pub fn add_comment(&self, title: &str, comment: &Comment) -> Result<(), StoreError> {
        let mut hub = self.hub();
        hub.store.add_comment(title, &comment.author, &comment.message)?;
        debug!(title, version = hub.store.version(), "Comment added");
        hub.publish();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Long polling
    // -----------------------------------------------------------------------

    /// Classify a collection GET and, if it must stall, register its
    /// waiter under the same lock as the version check.
    ///
    /// The requested wait is clamped to the configured maximum.
    pub fn poll(self: &Arc<Self>, request: &PollRequest) -> PollOutcome {
        let mut hub = self.hub();
        let version = hub.store.version();

        if !request.known_versions.contains(&version) {
            return PollOutcome::Fresh(hub.store.list());
        }
        let Some(wait) = request.wait else {
            return PollOutcome::NotModified;
        };
        if hub.shutting_down {
            return PollOutcome::NotModified;
        }

        let deadline = wait.min(self.poll_config.max_wait());
        let (id, rx) = hub.coordinator.register();
        debug!(version, wait_secs = deadline.as_secs(), "Long-poll waiter registered");

        PollOutcome::Waiting(PendingPoll {
            state: Arc::clone(self),
            id,
            rx,
            deadline,
        })
    }

    /// Remove a waiter. `true` if it was still pending.
    fn settle(&self, id: WaiterId) -> bool {
        self.hub().coordinator.settle(id)
    }

    /// Release every pending waiter (each answers 304) and stop accepting
    /// new ones; later stale polls answer 304 at once. Used at shutdown.
    pub fn release_waiters(&self) -> usize {
        let mut hub = self.hub();
        hub.shutting_down = true;
        let released = hub.coordinator.release_all();
        debug!(released, "Released long-poll waiters");
        released
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// PendingPoll
// ---------------------------------------------------------------------------

/// A stalled collection GET.
///
/// Await [`resolve`](Self::resolve) to get its single terminal state.
#[derive(Debug)]
pub struct PendingPoll {
    state: Arc<AppState>,
    id: WaiterId,
    rx: oneshot::Receiver<Snapshot>,
    deadline: Duration,
}

impl PendingPoll {
    /// How long this waiter may stall.
    pub const fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Wait for a change or the deadline, whichever comes first.
    ///
    /// When the timer fires, the waiter is claimed under the hub lock. If
    /// a mutation already claimed it, the snapshot it sent is waiting in
    /// the channel and is returned instead of a timeout.
    pub async fn resolve(mut self) -> PollResolution {
        match tokio::time::timeout(self.deadline, &mut self.rx).await {
            Ok(Ok(snapshot)) => PollResolution::Woken(snapshot),
            Ok(Err(_)) => PollResolution::TimedOut,
            Err(_) => {
                if self.state.settle(self.id) {
                    PollResolution::TimedOut
                } else {
                    self.rx
                        .try_recv()
                        .map_or(PollResolution::TimedOut, PollResolution::Woken)
                }
            }
        }
    }
}

impl Drop for PendingPoll {
    fn drop(&mut self) {
        if self.state.settle(self.id) {
            debug!("Long-poll client went away, waiter removed");
        }
    }
}
