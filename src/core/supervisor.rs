//! # Supervisor: composes logic flows over the event bus.
//!
//! The [`Supervisor`] owns global configuration, the host [`Store`] handle,
//! the injected dependencies, the [`MonitorHub`], and one [`CancelSignal`]
//! per registered definition. [`Supervisor::run`] subscribes to the bus once
//! and chains a [`LogicFlow`] per definition; the last flow's output is
//! returned to the host.
//!
//! ## High-level architecture
//! ```text
//! Inputs to run():
//!   Vec<LogicDef>  +  &Bus
//!
//! Wiring:
//!   Bus.subscribe() ─► bridge (lag-aware) ─► flow #1 ─► ... ─► flow #N ─► output
//!
//! Observability:
//!   actors ── MonitorHub.note() ──► monitor listener ──► SubscriberSet
//!                                                      ┌─────┬─────┐
//!                                                      ▼     ▼     ▼
//!                                                   worker1 ... workerN
//!
//! Shutdown path:
//!   shutdown():
//!     runtime_token.cancel()  → propagates to every live actor token
//!     tracker.close(); wait with cfg.grace:
//!       ├─ all finished → Ok(())
//!       └─ grace exceeded → Err(GraceExceeded { stuck: live logic names })
//! ```
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use logicvisor::{
//!     Bus, Context, Dispatcher, Event, LogicDef, ProcessFn, Store, Supervisor, SupervisorConfig,
//! };
//! use serde_json::{json, Value};
//!
//! struct Pipeline;
//! impl Store for Pipeline {
//!     fn dispatch(&self, event: Event) { println!("dispatched: {}", event.tag); }
//!     fn state(&self) -> Value { Value::Null }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let sup = Supervisor::new(SupervisorConfig::default(), Arc::new(Pipeline));
//!     let bus = Bus::new(1024);
//!
//!     let fetch = LogicDef::new(
//!         "fetch",
//!         "FETCH",
//!         ProcessFn::arc(|_ctx: Context, out: Dispatcher| async move {
//!             out.dispatch(json!({ "users": [] }));
//!             Ok(None)
//!         }),
//!     )
//!     .with_success_tag("FETCH_OK");
//!
//!     let mut output = sup.run(vec![fetch], &bus);
//!     bus.publish(Event::new("FETCH"));
//!     while let Some(ev) = output.recv().await {
//!         println!("passed through: {}", ev.tag);
//!     }
//! }
//! ```

use std::sync::{Arc, Mutex};

use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::core::actor::ActorShared;
use crate::core::cancel::CancelSignal;
use crate::core::config::SupervisorConfig;
use crate::core::flow::LogicFlow;
use crate::error::RuntimeError;
use crate::events::{Bus, Event};
use crate::logic::{Deps, LogicDef, Store};
use crate::monitor::{MonitorHub, MonitorNote, Subscribe, SubscriberSet};

/// Coordinates logic flows, monitor delivery, and graceful shutdown.
pub struct Supervisor {
    cfg: SupervisorConfig,
    store: Arc<dyn Store>,
    deps: Option<Deps>,
    monitor: MonitorHub,
    subscribers: Mutex<Vec<Arc<dyn Subscribe>>>,
    runtime: CancellationToken,
    tracker: TaskTracker,
    hubs: Mutex<Vec<(Arc<str>, Arc<CancelSignal>)>>,
}

impl Supervisor {
    /// Creates a supervisor bound to the host store.
    pub fn new(cfg: SupervisorConfig, store: Arc<dyn Store>) -> Self {
        let monitor = MonitorHub::new(cfg.monitor_capacity);
        Self {
            cfg,
            store,
            deps: None,
            monitor,
            subscribers: Mutex::new(Vec::new()),
            runtime: CancellationToken::new(),
            tracker: TaskTracker::new(),
            hubs: Mutex::new(Vec::new()),
        }
    }

    /// Injects the opaque dependency object handed to every hook context.
    pub fn with_deps(mut self, deps: Deps) -> Self {
        self.deps = Some(deps);
        self
    }

    /// Adds monitor subscribers, fanned out when `run` starts.
    pub fn with_subscribers(self, subs: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers
            .lock()
            .expect("subscriber list poisoned")
            .extend(subs);
        self
    }

    /// Creates a raw receiver of monitor notes.
    pub fn monitor(&self) -> broadcast::Receiver<MonitorNote> {
        self.monitor.subscribe()
    }

    /// Wires the definitions over the bus and returns the output stream:
    /// pass-through events that matched no definition, plus events forwarded
    /// by intercept gates. Dispatched events go to the [`Store`] directly and
    /// do not appear here.
    pub fn run(&self, logics: Vec<LogicDef>, bus: &Bus) -> mpsc::Receiver<Event> {
        self.monitor_listener();

        let mut rx = self.bridge(bus);
        for def in logics {
            let def = Arc::new(def);
            let hub = Arc::new(CancelSignal::new(&self.runtime));
            self.hubs
                .lock()
                .expect("hub list poisoned")
                .push((def.name_arc(), Arc::clone(&hub)));

            let flow = LogicFlow {
                shared: ActorShared {
                    def,
                    store: Arc::clone(&self.store),
                    deps: self.deps.clone(),
                    monitor: self.monitor.clone(),
                    hub,
                    tracker: self.tracker.clone(),
                    warn_diagnostics: self.cfg.warn_diagnostics,
                },
                capacity: self.cfg.channel_capacity_clamped(),
            };
            rx = flow.spawn(rx);
        }
        rx
    }

    /// Cancels every live actor and waits up to [`SupervisorConfig::grace`]
    /// for supervised tasks to finish.
    ///
    /// Returns [`RuntimeError::GraceExceeded`] naming the definitions that
    /// still held live actors when the window elapsed.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        self.runtime.cancel();
        self.tracker.close();

        match tokio::time::timeout(self.cfg.grace, self.tracker.wait()).await {
            Ok(()) => Ok(()),
            Err(_) => {
                let stuck: Vec<String> = self
                    .hubs
                    .lock()
                    .expect("hub list poisoned")
                    .iter()
                    .filter(|(_, hub)| hub.busy())
                    .map(|(name, _)| name.to_string())
                    .collect();
                Err(RuntimeError::GraceExceeded {
                    grace: self.cfg.grace,
                    stuck,
                })
            }
        }
    }

    /// Bridges the broadcast bus into the first flow's bounded input,
    /// reporting lag instead of silently skipping.
    fn bridge(&self, bus: &Bus) -> mpsc::Receiver<Event> {
        let mut rx = bus.subscribe();
        let (tx, out) = mpsc::channel(self.cfg.channel_capacity_clamped());
        let runtime = self.runtime.clone();
        self.tracker.spawn(async move {
            loop {
                tokio::select! {
                    _ = runtime.cancelled() => break,
                    msg = rx.recv() => match msg {
                        Ok(ev) => {
                            if tx.send(ev).await.is_err() {
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            tracing::warn!(skipped = n, "event bridge lagged behind the bus");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
        });
        out
    }

    /// Subscribes to the monitor hub and fans notes out to the registered
    /// subscribers (fire-and-forget).
    fn monitor_listener(&self) {
        let subs: Vec<Arc<dyn Subscribe>> = {
            let mut guard = self.subscribers.lock().expect("subscriber list poisoned");
            std::mem::take(&mut *guard)
        };
        if subs.is_empty() {
            return;
        }
        let set = SubscriberSet::new(subs);
        let mut rx = self.monitor.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(note) => set.emit(&note),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "monitor listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            set.shutdown().await;
        });
    }
}
