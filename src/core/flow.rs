//! # LogicFlow: the per-definition stream transformer.
//!
//! One flow wraps one [`LogicDef`] around an event stream:
//!
//! ```text
//! input ──┬── cancel-matching (raw) ──► CancelSignal::fire()
//!         ├── matched ──► limiter ──► admission ──► LogicActor (spawned)
//!         └── unmatched ─────────────────────────► output (pass-through)
//!                                  actor Next-forwards ──► output
//! ```
//!
//! Definitions chain: each flow consumes the previous flow's output, so an
//! event passes through every definition exactly once and pass-through
//! events are never duplicated.
//!
//! ## Ordering rules
//! - The flow task is the **single** place where raw events are routed and
//!   actors are admitted; its select loop is biased toward pending
//!   admissions, so an already-admitted event registers its cancellation
//!   token before the next raw event can fire the hub. This is what makes
//!   take-latest airtight: the older actor is always registered (and thus
//!   cancellable) before the newer event is looked at.
//! - The cancel feed observes **raw** matched events, not rate-limited ones:
//!   an event swallowed by the debouncer still cancels in-flight actors.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::core::actor::{ActorShared, LogicActor};
use crate::core::limiter;
use crate::events::Event;

/// Builder-free bundle: everything one flow stage needs.
pub(crate) struct LogicFlow {
    pub shared: ActorShared,
    pub capacity: usize,
}

impl LogicFlow {
    /// Spawns the flow over `input`, returning its output stream.
    pub(crate) fn spawn(self, mut input: mpsc::Receiver<Event>) -> mpsc::Receiver<Event> {
        let capacity = self.capacity.max(1);
        let (out_tx, out_rx) = mpsc::channel::<Event>(capacity);
        let (match_tx, match_rx) = mpsc::channel::<Event>(capacity);

        let def = Arc::clone(&self.shared.def);
        let mut limited = limiter::spawn(match_rx, def.debounce(), def.throttle(), capacity);
        let hub = Arc::clone(&self.shared.hub);
        let tracker = self.shared.tracker.clone();
        let shared = self.shared;
        let actor_out = out_tx.clone();

        tracker.clone().spawn(async move {
            let mut match_tx = Some(match_tx);
            let mut input_open = true;
            let mut limited_open = true;

            while input_open || limited_open {
                tokio::select! {
                    biased;
                    admitted = limited.recv(), if limited_open => match admitted {
                        Some(ev) => {
                            // register before spawning: a later fire() must
                            // be able to reach this actor
                            let (cancel_id, cancel) = hub.subscribe();
                            let actor = LogicActor::new(
                                shared.clone(),
                                ev,
                                cancel,
                                cancel_id,
                                actor_out.clone(),
                            );
                            tracker.spawn(actor.run());
                        }
                        None => limited_open = false,
                    },
                    raw = input.recv(), if input_open => match raw {
                        Some(ev) => {
                            if def.cancels_on(&ev.tag) {
                                hub.fire();
                            }
                            if def.match_tag().matches(&ev.tag) {
                                if let Some(tx) = &match_tx {
                                    let _ = tx.send(ev).await;
                                }
                            } else if out_tx.send(ev).await.is_err() {
                                // downstream gone: stop consuming
                                return;
                            }
                        }
                        None => {
                            input_open = false;
                            // close the limiter so it flushes and completes
                            match_tx = None;
                        }
                    },
                }
            }
        });

        out_rx
    }
}
