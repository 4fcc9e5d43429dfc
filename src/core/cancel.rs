//! # Cancellation hub: one per logic definition.
//!
//! [`CancelSignal`] is the continuous cancellation broadcast of a logic
//! definition. It is fed by the flow task from the union of raw events
//! matching the cancel pattern and, under take-latest, raw events matching
//! the match pattern itself. It never completes on its own; it fires
//! repeatedly for the life of the supervisor.
//!
//! Every actor subscribes a private token at creation. [`fire`] drains the
//! registry and cancels all tokens registered so far, so:
//! - each actor reacts to **at most one** cancellation (its token is removed
//!   on fire and never re-armed),
//! - an actor created **after** a fire is unaffected by it (under
//!   take-latest, an event must never cancel its own actor).
//!
//! Tokens are children of the supervisor's runtime token, so shutdown
//! propagates to every live actor without going through the hub.
//!
//! [`fire`]: CancelSignal::fire

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

/// Registry of live per-actor cancellation tokens for one logic definition.
pub(crate) struct CancelSignal {
    runtime: CancellationToken,
    next_id: AtomicU64,
    live: Mutex<HashMap<u64, CancellationToken>>,
    /// Hook tasks (intercept/process) currently running for this definition.
    tasks: AtomicUsize,
}

/// RAII marker for one running hook task; see [`CancelSignal::task_guard`].
pub(crate) struct TaskGuard {
    hub: Arc<CancelSignal>,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.hub.tasks.fetch_sub(1, Ordering::Relaxed);
    }
}

impl CancelSignal {
    /// Creates a hub whose tokens are children of `runtime`.
    pub(crate) fn new(runtime: &CancellationToken) -> Self {
        Self {
            runtime: runtime.clone(),
            next_id: AtomicU64::new(0),
            live: Mutex::new(HashMap::new()),
            tasks: AtomicUsize::new(0),
        }
    }

    /// Registers a fresh token for one actor. Returns the registration id
    /// (for [`forget`](CancelSignal::forget)) and the token.
    pub(crate) fn subscribe(&self) -> (u64, CancellationToken) {
        let token = self.runtime.child_token();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.live
            .lock()
            .expect("cancel registry poisoned")
            .insert(id, token.clone());
        (id, token)
    }

    /// Cancels every token registered so far, consuming the registrations.
    pub(crate) fn fire(&self) {
        let drained: Vec<CancellationToken> = {
            let mut live = self.live.lock().expect("cancel registry poisoned");
            live.drain().map(|(_, t)| t).collect()
        };
        for token in drained {
            token.cancel();
        }
    }

    /// Removes a registration at actor end.
    pub(crate) fn forget(&self, id: u64) {
        self.live
            .lock()
            .expect("cancel registry poisoned")
            .remove(&id);
    }

    /// Number of live (registered, unfired) actors.
    pub(crate) fn live(&self) -> usize {
        self.live.lock().expect("cancel registry poisoned").len()
    }

    /// Marks one hook task as running until the guard drops.
    pub(crate) fn task_guard(self: &Arc<Self>) -> TaskGuard {
        self.tasks.fetch_add(1, Ordering::Relaxed);
        TaskGuard {
            hub: Arc::clone(self),
        }
    }

    /// True while the definition has live actors or running hook tasks.
    /// Used by shutdown to name stuck definitions.
    pub(crate) fn busy(&self) -> bool {
        self.live() > 0 || self.tasks.load(Ordering::Relaxed) > 0
    }
}
