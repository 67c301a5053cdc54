//! Pending long-poll waiters.
//!
//! [`LongPollCoordinator`] keeps one [`oneshot::Sender`] per client that
//! is stalled on `GET /talks`. A waiter leaves the pending list exactly
//! once, through whichever of these happens first:
//!
//! - [`notify_all`](LongPollCoordinator::notify_all) sends it the fresh
//!   snapshot (WOKEN),
//! - [`settle`](LongPollCoordinator::settle) drops its sender because the
//!   deadline passed or the client went away (TIMED OUT),
//! - [`release_all`](LongPollCoordinator::release_all) drops every sender
//!   at shutdown.
//!
//! Because the sender is moved out of the map on removal, the losing path
//! finds nothing to resolve. The coordinator is not synchronised itself;
//! [`AppState`](crate::state::AppState) serialises access to it together
//! with the store.

use std::collections::BTreeMap;

use tokio::sync::oneshot;

use crate::store::Snapshot;

/// Identifier of a pending waiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WaiterId(u64);

/// Registry of clients waiting for the next change.
#[derive(Debug, Default)]
pub struct LongPollCoordinator {
    pending: BTreeMap<WaiterId, oneshot::Sender<Snapshot>>,
    next_id: u64,
}

impl LongPollCoordinator {
    /// Create a coordinator with no pending waiters.
    pub const fn new() -> Self {
        Self {
            pending: BTreeMap::new(),
            next_id: 0,
        }
    }

    /// Add a waiter and return its id plus the receiving half.
    ///
    /// The receiver yields a [`Snapshot`] if a change is published before
    /// the waiter is settled, and an error if the waiter is settled or
    /// released instead.
    pub fn register(&mut self) -> (WaiterId, oneshot::Receiver<Snapshot>) {
        let id = WaiterId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);

        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);
        (id, rx)
    }

    /// Remove a waiter without resolving it with data.
    ///
    /// Returns `true` if the waiter was still pending, meaning the caller
    /// won the race and owns the terminal transition. Returns `false` if
    /// it was already woken or released.
    pub fn settle(&mut self, id: WaiterId) -> bool {
        self.pending.remove(&id).is_some()
    }

    /// Resolve every pending waiter with `snapshot` and clear the list.
    ///
    /// Returns how many waiters were handed the snapshot. Waiters whose
    /// receiver has already been dropped are skipped silently.
    pub fn notify_all(&mut self, snapshot: &Snapshot) -> usize {
        let pending = std::mem::take(&mut self.pending);
        pending
            .into_values()
            .map(|tx| tx.send(snapshot.clone()))
            .filter(Result::is_ok)
            .count()
    }

    /// Drop every pending waiter. Their receivers observe a closed channel.
    pub fn release_all(&mut self) -> usize {
        let released = self.pending.len();
        self.pending.clear();
        released
    }

    /// Number of pending waiters.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}
