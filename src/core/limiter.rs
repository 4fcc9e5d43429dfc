//! # Admission rate limiting: debounce and throttle.
//!
//! Wraps the matched sub-stream of a logic definition with optional burst
//! collapsing (trailing debounce) and frequency capping (leading-edge
//! throttle). With neither configured the input channel is returned
//! untouched — no task, no copy.
//!
//! ## Semantics
//! - **Debounce**: each new event resets the window; only an event followed
//!   by a quiet window survives. A pending event is flushed when the input
//!   closes.
//! - **Throttle**: an event passes immediately, then matching events are
//!   dropped until the window elapses.
//! - **Both**: debounce first, then throttle on the debounced output — slow
//!   down bursts, then cap frequency. Documented composition order; the
//!   reverse is defensible but not what this engine promises.
//!
//! Rate limiting runs **before** take-latest admission; the cancel feed of a
//! definition observes the raw stream, not the limited one.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{self, Instant};

use crate::events::Event;

/// Applies the configured windows to `input`, returning the limited stream.
pub(crate) fn spawn(
    input: mpsc::Receiver<Event>,
    debounce: Option<Duration>,
    throttle: Option<Duration>,
    capacity: usize,
) -> mpsc::Receiver<Event> {
    let mut rx = input;
    if let Some(window) = debounce {
        rx = spawn_debounce(rx, window, capacity);
    }
    if let Some(window) = throttle {
        rx = spawn_throttle(rx, window, capacity);
    }
    rx
}

/// Trailing debounce: only the last event of a burst survives.
fn spawn_debounce(
    mut rx: mpsc::Receiver<Event>,
    window: Duration,
    capacity: usize,
) -> mpsc::Receiver<Event> {
    let (tx, out) = mpsc::channel(capacity.max(1));
    tokio::spawn(async move {
        loop {
            // idle until something arrives
            let Some(first) = rx.recv().await else {
                return;
            };
            let mut pending = first;
            let sleep = time::sleep(window);
            tokio::pin!(sleep);
            loop {
                tokio::select! {
                    _ = &mut sleep => {
                        if tx.send(pending).await.is_err() {
                            return;
                        }
                        break;
                    }
                    next = rx.recv() => match next {
                        Some(ev) => {
                            pending = ev;
                            sleep.as_mut().reset(Instant::now() + window);
                        }
                        None => {
                            // input closed: flush the pending event
                            let _ = tx.send(pending).await;
                            return;
                        }
                    },
                }
            }
        }
    });
    out
}

/// Leading-edge throttle: pass one, drop the rest of the window.
fn spawn_throttle(
    mut rx: mpsc::Receiver<Event>,
    window: Duration,
    capacity: usize,
) -> mpsc::Receiver<Event> {
    let (tx, out) = mpsc::channel(capacity.max(1));
    tokio::spawn(async move {
        let mut next_allowed: Option<Instant> = None;
        while let Some(ev) = rx.recv().await {
            let now = Instant::now();
            let pass = next_allowed.map_or(true, |at| now >= at);
            if pass {
                next_allowed = Some(now + window);
                if tx.send(ev).await.is_err() {
                    return;
                }
            }
        }
    });
    out
}
