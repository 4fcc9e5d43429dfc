//! # LogicActor: the per-event lifecycle state machine.
//!
//! One actor is created per event admitted past rate limiting. It drives the
//! event through the intercept gate, the process hook, and the dispatch
//! channel, reporting every step to the monitor.
//!
//! ## Lifecycle
//! ```text
//! Created ──► Intercepting ──► Processing ──► Dispatching ──► Ended
//!                  │                              ▲
//!                  ├─ reject ─────────────────────┤ (drain force-closed channel)
//!                  ├─ cancel ─► note Cancelled ───┤
//!                  └─ unresolved gate ─► diagnose ┘
//!
//! During Dispatching:
//!   cancel ─► note DispCancelled ─► Ended
//!   error item ─► fail-wrap ─► deliver ─► Ended
//!   channel complete ─► Ended
//! ```
//!
//! ## Rules
//! - Exactly **one** `End` note per actor, on every path.
//! - Cancellation is observed at safe points (gate wait, channel drain) and
//!   wins over ready items; a hook mid-execution is never aborted, only its
//!   further dispatches are suppressed.
//! - The warn timer is diagnostic only: it reports an actor that outlives
//!   its window, it never terminates one.

use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::core::cancel::CancelSignal;
use crate::core::dispatch::{DispatchValue, Dispatcher, Outflow};
use crate::core::gate::{Gate, GateDecision, UseDispatch};
use crate::error::LogicError;
use crate::events::Event;
use crate::logic::{Context, Deps, LogicDef, Store};
use crate::monitor::{MonitorHub, MonitorNote, MonitorOp};

/// Explicit lifecycle phase, replacing ad-hoc completion flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Created,
    /// Waiting for the gate to resolve.
    Intercepting,
    /// Gate resolved; nothing delivered yet. Rejected actors pass through
    /// here briefly while their force-closed channel drains.
    Processing,
    /// At least one event was delivered to the host store.
    Dispatching,
    Ended,
}

/// Phase transitions for one actor, kept separate so they are directly
/// testable without channel plumbing.
#[derive(Debug)]
pub(crate) struct Lifecycle {
    phase: Phase,
}

impl Lifecycle {
    pub(crate) fn new() -> Self {
        Self {
            phase: Phase::Created,
        }
    }

    pub(crate) fn begin(&mut self) {
        debug_assert_eq!(self.phase, Phase::Created);
        self.phase = Phase::Intercepting;
    }

    pub(crate) fn resolve_gate(&mut self) {
        debug_assert_eq!(self.phase, Phase::Intercepting);
        self.phase = Phase::Processing;
    }

    /// First delivery to the host store: dispatching has begun.
    pub(crate) fn dispatching(&mut self) {
        if self.phase == Phase::Processing {
            self.phase = Phase::Dispatching;
        }
    }

    /// Which cancellation note applies: `Cancelled` before dispatching
    /// begins, `DispCancelled` once a delivery happened.
    pub(crate) fn cancel_op(&self) -> MonitorOp {
        if self.phase == Phase::Dispatching {
            MonitorOp::DispCancelled
        } else {
            MonitorOp::Cancelled
        }
    }

    pub(crate) fn end(&mut self) {
        self.phase = Phase::Ended;
    }

    #[cfg(test)]
    pub(crate) fn phase(&self) -> Phase {
        self.phase
    }
}

/// Shared construction parameters, identical for every actor of a flow.
#[derive(Clone)]
pub(crate) struct ActorShared {
    pub def: Arc<LogicDef>,
    pub store: Arc<dyn Store>,
    pub deps: Option<Deps>,
    pub monitor: MonitorHub,
    pub hub: Arc<CancelSignal>,
    pub tracker: TaskTracker,
    pub warn_diagnostics: bool,
}

/// The unit of work for one admitted event.
pub(crate) struct LogicActor {
    shared: ActorShared,
    source: Event,
    cancel: CancellationToken,
    cancel_id: u64,
    out: mpsc::Sender<Event>,
    lifecycle: Lifecycle,
}

impl LogicActor {
    /// Creates an actor bound to an already-registered cancellation token.
    ///
    /// The caller must register the token with the hub **before** handing it
    /// here, synchronously with admission, so a take-latest fire triggered by
    /// the next raw event can never slip between admission and registration.
    pub(crate) fn new(
        shared: ActorShared,
        source: Event,
        cancel: CancellationToken,
        cancel_id: u64,
        out: mpsc::Sender<Event>,
    ) -> Self {
        Self {
            shared,
            source,
            cancel,
            cancel_id,
            out,
            lifecycle: Lifecycle::new(),
        }
    }

    /// Runs the actor to completion.
    pub(crate) async fn run(mut self) {
        self.note(MonitorOp::Begin);
        self.lifecycle.begin();

        let ended = CancellationToken::new();
        self.arm_warn_timer(&ended);

        let (tx, mut rx) = mpsc::unbounded_channel::<Outflow>();
        let dispatcher = Dispatcher::new(
            self.shared.def.name_arc(),
            tx,
            self.shared.def.dispatch_multiple(),
            self.cancel.clone(),
        );

        let ctx = Context::new(
            self.shared.deps.clone(),
            Arc::clone(&self.shared.store),
            self.cancel.clone(),
            self.source.clone(),
        );

        match self.shared.def.intercept().cloned() {
            None => {
                // auto-allow: the source event continues down the pipeline
                // untouched, no gate activity to report
                let _ = self.out.send(self.source.clone()).await;
                self.lifecycle.resolve_gate();
                self.spawn_process(ctx.with_event(self.source.clone()), dispatcher.clone());
            }
            Some(hook) => {
                let (gate, rx_decision) = Gate::new();
                let hook_ctx = ctx.clone();
                let guard = self.shared.hub.task_guard();
                self.shared.tracker.spawn(async move {
                    hook.run(hook_ctx, gate).await;
                    drop(guard);
                });

                let cancel = self.cancel.clone();
                let decision = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        self.note(self.lifecycle.cancel_op());
                        self.finish(&ended);
                        return;
                    }
                    decision = rx_decision => decision.unwrap_or(GateDecision::Unresolved),
                };

                let (should_process, event, opts) = match decision {
                    GateDecision::Allow { event, opts } => (true, event, opts),
                    GateDecision::Reject { event, opts } => (false, event, opts),
                    GateDecision::Unresolved => {
                        tracing::error!(
                            logic = self.shared.def.name(),
                            "intercept resolved neither allow nor reject; ending actor"
                        );
                        dispatcher.close();
                        self.lifecycle.resolve_gate();
                        self.drain(&mut rx).await;
                        self.finish(&ended);
                        return;
                    }
                };

                let effective = event.clone().unwrap_or_else(|| self.source.clone());
                match &event {
                    Some(ev) if self.gate_dispatches(ev, opts.use_dispatch) => {
                        self.note_with(MonitorOp::NextDisp, Some(ev.clone()), Some(should_process));
                        dispatcher.dispatch_intercept(ev.clone());
                    }
                    Some(ev) => {
                        self.note_with(MonitorOp::Next, Some(ev.clone()), Some(should_process));
                        let _ = self.out.send(ev.clone()).await;
                    }
                    None => {
                        self.note_with(MonitorOp::Filtered, None, Some(should_process));
                    }
                }
                self.lifecycle.resolve_gate();

                if should_process {
                    self.spawn_process(ctx.with_event(effective), dispatcher.clone());
                } else {
                    dispatcher.close();
                }
            }
        }

        self.drain(&mut rx).await;
        self.finish(&ended);
    }

    /// True when a gate-produced event goes to the host store instead of the
    /// output stream.
    fn gate_dispatches(&self, ev: &Event, use_dispatch: UseDispatch) -> bool {
        match use_dispatch {
            UseDispatch::Auto => ev.tag != self.source.tag,
            UseDispatch::Always => true,
            UseDispatch::Never => false,
        }
    }

    /// Runs the process hook on its own task; its outcome feeds back through
    /// the dispatcher, so the drain loop below is the only consumer.
    fn spawn_process(&self, ctx: Context, dispatcher: Dispatcher) {
        let process = Arc::clone(self.shared.def.process());
        let dispatch_return = self.shared.def.dispatch_return();
        let name = self.shared.def.name_arc();
        let guard = self.shared.hub.task_guard();

        self.shared.tracker.spawn(async move {
            let _guard = guard;
            let fut = process.run(ctx, dispatcher.clone());
            match std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                Ok(Ok(Some(value))) => {
                    if dispatch_return {
                        dispatcher.dispatch(value);
                    }
                }
                Ok(Ok(None)) => {
                    if dispatch_return {
                        dispatcher.done();
                    }
                }
                Ok(Err(e)) => {
                    dispatcher.dispatch(DispatchValue::Error(e));
                }
                Err(panic) => {
                    tracing::error!(logic = &*name, "process hook panicked: {panic:?}");
                    dispatcher
                        .dispatch(DispatchValue::Error(LogicError::Fail("process panicked".into())));
                }
            }
        });
    }

    /// Consumes the dispatch channel until completion, error, or cancellation.
    async fn drain(&mut self, rx: &mut mpsc::UnboundedReceiver<Outflow>) {
        let cancel = self.cancel.clone();
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    self.note(self.lifecycle.cancel_op());
                    return;
                }
                item = rx.recv() => match item {
                    Some(Outflow::Intercept(ev)) => {
                        self.deliver(ev);
                    }
                    Some(Outflow::Event(ev)) => {
                        if let Some(ev) = self.wrap_success_event(ev) {
                            self.deliver(ev);
                        }
                    }
                    Some(Outflow::Value(v)) => {
                        if let Some(ev) = self.wrap_success_value(v) {
                            self.deliver(ev);
                        }
                    }
                    Some(Outflow::Error(e)) => {
                        if let Some(ev) = self.wrap_error(e) {
                            self.deliver(ev);
                        }
                        // an error terminates the channel
                        return;
                    }
                    None => return,
                },
            }
        }
    }

    /// Delivers one outgoing event to the host store.
    fn deliver(&mut self, ev: Event) {
        self.lifecycle.dispatching();
        self.shared.store.dispatch(ev.clone());
        self.note_with(MonitorOp::Dispatch, Some(ev), None);
    }

    /// Success plane, complete event.
    fn wrap_success_event(&self, ev: Event) -> Option<Event> {
        match self.shared.def.success_tag() {
            Some(wrap) => wrap.apply(ev.to_value(), false),
            None => Some(ev),
        }
    }

    /// Success plane, raw payload.
    fn wrap_success_value(&self, v: serde_json::Value) -> Option<Event> {
        match self.shared.def.success_tag() {
            Some(wrap) => wrap.apply(v, false),
            None => Event::from_value(v).or_else(|| {
                tracing::warn!(
                    logic = self.shared.def.name(),
                    "dispatched value is not an event and no success_tag is set; dropped"
                );
                None
            }),
        }
    }

    /// Error plane. `None` means the dispatch was deliberately suppressed;
    /// the channel terminates either way.
    fn wrap_error(&self, e: LogicError) -> Option<Event> {
        if let Some(wrap) = self.shared.def.fail_tag() {
            return wrap.apply(e.into_payload(), true);
        }
        match e {
            LogicError::Event(ev) => Some(if ev.error { ev } else { ev.with_error() }),
            LogicError::Payload(v) => match Event::from_value(v.clone()) {
                Some(ev) => Some(if ev.error { ev } else { ev.with_error() }),
                None => Some(Event::unhandled(v)),
            },
            LogicError::Fail(msg) => Some(Event::unhandled(serde_json::Value::String(msg))),
        }
    }

    /// Terminal bookkeeping; the single exit point guarantees one `End` note.
    fn finish(&mut self, ended: &CancellationToken) {
        ended.cancel();
        self.shared.hub.forget(self.cancel_id);
        self.lifecycle.end();
        self.note(MonitorOp::End);
    }

    fn arm_warn_timer(&self, ended: &CancellationToken) {
        let Some(window) = self.shared.def.warn_timeout() else {
            return;
        };
        if !self.shared.warn_diagnostics || window.is_zero() {
            return;
        }
        let ended = ended.clone();
        let name = self.shared.def.name_arc();
        tokio::spawn(async move {
            tokio::select! {
                _ = ended.cancelled() => {}
                _ = time::sleep(window) => {
                    tracing::error!(
                        logic = &*name,
                        "still running after {:?}; forgot to call done()? disable with warn_timeout = None",
                        window
                    );
                }
            }
        });
    }

    fn note(&self, op: MonitorOp) {
        self.note_with(op, None, None);
    }

    fn note_with(&self, op: MonitorOp, derived: Option<Event>, should_process: Option<bool>) {
        let mut note = MonitorNote::new(self.shared.def.name_arc(), self.source.clone(), op);
        note.derived = derived;
        note.should_process = should_process;
        self.shared.monitor.note(note);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_happy_path() {
        let mut lc = Lifecycle::new();
        assert_eq!(lc.phase(), Phase::Created);
        lc.begin();
        assert_eq!(lc.phase(), Phase::Intercepting);
        lc.resolve_gate();
        assert_eq!(lc.phase(), Phase::Processing);
        lc.dispatching();
        assert_eq!(lc.phase(), Phase::Dispatching);
        lc.end();
        assert_eq!(lc.phase(), Phase::Ended);
    }

    #[test]
    fn cancel_note_flips_on_first_delivery() {
        let mut lc = Lifecycle::new();
        lc.begin();
        assert_eq!(lc.cancel_op(), MonitorOp::Cancelled);
        lc.resolve_gate();
        // gate resolved but nothing delivered yet: still plain Cancelled
        assert_eq!(lc.cancel_op(), MonitorOp::Cancelled);
        lc.dispatching();
        assert_eq!(lc.cancel_op(), MonitorOp::DispCancelled);
    }

    #[test]
    fn dispatching_only_advances_from_processing() {
        let mut lc = Lifecycle::new();
        lc.begin();
        lc.dispatching();
        assert_eq!(lc.phase(), Phase::Intercepting);
    }
}
