//! # The intercept gate decision surface.
//!
//! A [`Gate`] is handed to the intercept hook of each actor. The hook must
//! resolve it exactly once:
//!
//! - [`Gate::allow`] — processing proceeds;
//! - [`Gate::reject`] — processing is suppressed, the actor ends.
//!
//! Both take an optional resulting event and (via the `_with` variants) a
//! [`GateOptions`] controlling how that event leaves the actor. Resolution
//! consumes the gate, so calling both — or calling one twice — does not
//! compile. Dropping the gate unresolved is the remaining protocol
//! violation; the `Drop` impl reports it to the actor, which diagnoses and
//! ends instead of hanging.

use tokio::sync::oneshot;

use crate::events::Event;

/// How a gate-produced event leaves the actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UseDispatch {
    /// Dispatch to the host store when the event's tag differs from the
    /// source tag; otherwise forward into the output stream.
    #[default]
    Auto,
    /// Always dispatch to the host store (bypasses success/fail wrapping).
    Always,
    /// Always forward into the output stream.
    Never,
}

/// Options accepted by [`Gate::allow_with`] / [`Gate::reject_with`].
#[derive(Debug, Clone, Copy, Default)]
pub struct GateOptions {
    /// Dispatch-decision for the resulting event.
    pub use_dispatch: UseDispatch,
}

/// Resolution of an intercept gate.
#[derive(Debug)]
pub(crate) enum GateDecision {
    /// Processing proceeds; `event` (if any) is forwarded per options.
    Allow {
        event: Option<Event>,
        opts: GateOptions,
    },
    /// Processing suppressed; `event` (if any) is still forwarded per options.
    Reject {
        event: Option<Event>,
        opts: GateOptions,
    },
    /// The gate was dropped without a decision.
    Unresolved,
}

/// One-shot decision handle for the intercept hook.
#[derive(Debug)]
pub struct Gate {
    tx: Option<oneshot::Sender<GateDecision>>,
}

impl Gate {
    pub(crate) fn new() -> (Self, oneshot::Receiver<GateDecision>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// Lets the actor proceed to processing.
    ///
    /// `event` replaces the source event for processing and is forwarded per
    /// [`UseDispatch::Auto`]; `None` forwards nothing and processing uses
    /// the source event.
    pub fn allow(self, event: Option<Event>) {
        self.allow_with(event, GateOptions::default());
    }

    /// [`allow`](Gate::allow) with explicit options.
    pub fn allow_with(mut self, event: Option<Event>, opts: GateOptions) {
        self.resolve(GateDecision::Allow { event, opts });
    }

    /// Stops the actor before processing.
    ///
    /// `event` (if any) is still forwarded per options — a rejected event
    /// may continue down the pipeline unchanged.
    pub fn reject(self, event: Option<Event>) {
        self.reject_with(event, GateOptions::default());
    }

    /// [`reject`](Gate::reject) with explicit options.
    pub fn reject_with(mut self, event: Option<Event>, opts: GateOptions) {
        self.resolve(GateDecision::Reject { event, opts });
    }

    fn resolve(&mut self, decision: GateDecision) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(decision);
        }
    }
}

impl Drop for Gate {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(GateDecision::Unresolved);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allow_delivers_decision() {
        let (gate, rx) = Gate::new();
        gate.allow(Some(Event::new("A")));
        match rx.await.unwrap() {
            GateDecision::Allow { event, .. } => assert_eq!(event, Some(Event::new("A"))),
            other => panic!("unexpected decision: {other:?}"),
        }
    }

    #[tokio::test]
    async fn reject_carries_options() {
        let (gate, rx) = Gate::new();
        gate.reject_with(
            None,
            GateOptions {
                use_dispatch: UseDispatch::Never,
            },
        );
        match rx.await.unwrap() {
            GateDecision::Reject { event, opts } => {
                assert!(event.is_none());
                assert_eq!(opts.use_dispatch, UseDispatch::Never);
            }
            other => panic!("unexpected decision: {other:?}"),
        }
    }

    #[tokio::test]
    async fn dropped_gate_reports_unresolved() {
        let (gate, rx) = Gate::new();
        drop(gate);
        assert!(matches!(rx.await.unwrap(), GateDecision::Unresolved));
    }
}
