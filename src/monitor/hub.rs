//! # Monitor hub: broadcast channel for lifecycle notes.
//!
//! Thin wrapper over [`tokio::sync::broadcast`], publishing
//! [`MonitorNote`]s from all logic actors to any number of observers.
//!
//! ## Rules
//! - **Non-blocking publish**: `note()` never blocks and never fails; with no
//!   receivers the note is dropped.
//! - **Bounded capacity**: slow receivers observe `RecvError::Lagged` and
//!   skip the oldest items.
//! - **Additive only**: nothing in the engine consumes this channel.

use tokio::sync::broadcast;

use super::note::MonitorNote;

/// Broadcast hub for monitor notes.
#[derive(Clone, Debug)]
pub struct MonitorHub {
    tx: broadcast::Sender<MonitorNote>,
}

impl MonitorHub {
    /// Creates a new hub with the given channel capacity (clamped to 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<MonitorNote>(capacity);
        Self { tx }
    }

    /// Publishes a note to all active observers.
    pub fn note(&self, note: MonitorNote) {
        let _ = self.tx.send(note);
    }

    /// Creates a new receiver observing subsequent notes.
    pub fn subscribe(&self) -> broadcast::Receiver<MonitorNote> {
        self.tx.subscribe()
    }
}
