//! # Lifecycle notifications emitted by logic actors.
//!
//! The [`MonitorOp`] enum classifies notification types across the actor
//! lifecycle; [`MonitorNote`] carries the source event and, where relevant,
//! the derived event and the gate decision.
//!
//! ## Ordering guarantees
//! For one actor, notes are strictly ordered:
//! ```text
//! Begin → (Filtered | NextDisp | Next)? → Dispatch* → (Cancelled | DispCancelled)? → End
//! ```
//! with exactly one `End` on every path. No ordering holds across actors.

use std::sync::Arc;

use crate::events::Event;

/// Classification of lifecycle notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorOp {
    /// Actor allocated for an admitted event.
    ///
    /// Sets: `logic`, `source`.
    Begin,

    /// Gate forwarded an event unchanged (same tag) into the output stream.
    ///
    /// Sets: `logic`, `source`, `derived` (forwarded event), `should_process`.
    Next,

    /// Gate forwarded nothing; processing (if allowed) uses the source event.
    ///
    /// Sets: `logic`, `source`, `should_process`.
    Filtered,

    /// Gate produced an event with a different tag, dispatched directly to
    /// the host store, bypassing success/fail wrapping.
    ///
    /// Sets: `logic`, `source`, `derived` (dispatched event), `should_process`.
    NextDisp,

    /// One outgoing event was delivered to the host store.
    ///
    /// Sets: `logic`, `source`, `derived` (delivered event).
    Dispatch,

    /// Actor cancelled before its gate resolved.
    ///
    /// Sets: `logic`, `source`.
    Cancelled,

    /// Actor cancelled after dispatching began.
    ///
    /// Sets: `logic`, `source`.
    DispCancelled,

    /// Terminal notification; exactly one per actor.
    ///
    /// Sets: `logic`, `source`.
    End,
}

/// Lifecycle notification with optional metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorNote {
    /// Name of the logic definition.
    pub logic: Arc<str>,
    /// The event that created the actor.
    pub source: Event,
    /// The derived event, for ops that carry one.
    pub derived: Option<Event>,
    /// Notification classification.
    pub op: MonitorOp,
    /// Gate decision (`true` = allow), for gate-originated ops.
    pub should_process: Option<bool>,
}

impl MonitorNote {
    /// Creates a new note of the given op.
    pub fn new(logic: Arc<str>, source: Event, op: MonitorOp) -> Self {
        Self {
            logic,
            source,
            derived: None,
            op,
            should_process: None,
        }
    }

    /// Attaches the derived event.
    #[inline]
    pub fn with_derived(mut self, derived: Event) -> Self {
        self.derived = Some(derived);
        self
    }

    /// Attaches the gate decision.
    #[inline]
    pub fn with_should_process(mut self, should_process: bool) -> Self {
        self.should_process = Some(should_process);
        self
    }
}
