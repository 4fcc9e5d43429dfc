//! # logicvisor
//!
//! **Logicvisor** is a per-event asynchronous task supervision library for
//! Rust. It sits on an event pipeline, matches events against registered
//! logic definitions, optionally validates/transforms them, runs a possibly
//! long-running side-effect procedure per matching event, and emits derived
//! events back into the pipeline — with correct cancellation, rate-limiting,
//! and ordering semantics.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   LogicDef   │   │   LogicDef   │   │   LogicDef   │
//!     │ (user logic) │   │ (user logic) │   │ (user logic) │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Supervisor (runtime orchestrator)                                │
//! │  - Bus bridge (multicast raw events in)                           │
//! │  - CancelSignal per definition (take-latest / cancel tags)        │
//! │  - MonitorHub (lifecycle notes out)                               │
//! │  - TaskTracker (graceful shutdown)                                │
//! └──────┬──────────────────────┬───────────────────────┬─────────────┘
//!        ▼                      ▼                       ▼
//!   LogicFlow #1 ──────► LogicFlow #2 ──────► ... ──► output stream
//!        │ per matched event (rate-limited):
//!        ▼
//!     ┌──────────────┐
//!     │  LogicActor  │  gate ─► process ─► dispatch channel
//!     └──────┬───────┘
//!            │ wrapped events            │ lifecycle notes
//!            ▼                           ▼
//!      Store::dispatch             MonitorHub ─► SubscriberSet
//! ```
//!
//! ### Actor lifecycle
//! ```text
//! admitted event ─► LogicActor::run()
//!
//!   ├─► note Begin, arm warn timer
//!   ├─► intercept gate (validate/transform)
//!   │       ├─ allow(ev)  ─► forward or direct-dispatch, then process
//!   │       ├─ allow(None)─► note Filtered, process the source event
//!   │       └─ reject     ─► close channel, never process
//!   ├─► process hook: dispatch(value | error | stream | pending) / done()
//!   ├─► drain channel: success/fail wrapping ─► Store::dispatch
//!   │       └─ error item terminates the channel
//!   └─► note End (exactly once)
//!
//! cancellation (cancel tag, take-latest, shutdown):
//!   - during gate wait ─► note Cancelled ─► End
//!   - during dispatch  ─► note DispCancelled ─► End
//! ```
//!
//! ## Features
//! | Area              | Description                                                       | Key types / traits                  |
//! |-------------------|-------------------------------------------------------------------|-------------------------------------|
//! | **Definitions**   | Declare what to match and how to react.                           | [`LogicDef`], [`TagPattern`]        |
//! | **Hooks**         | Validate/transform and process procedures.                        | [`Intercept`], [`Process`]          |
//! | **Dispatch**      | Emit events, values, errors, streams, futures.                    | [`Dispatcher`], [`DispatchValue`]   |
//! | **Admission**     | Take-latest, explicit cancel tags, debounce, throttle.            | [`LogicDef`] builder methods        |
//! | **Observability** | Structured lifecycle notes, fan-out subscribers.                  | [`MonitorNote`], [`Subscribe`]      |
//! | **Errors**        | Typed errors for the runtime and the process error plane.         | [`RuntimeError`], [`LogicError`]    |
//! | **Configuration** | Centralized runtime settings.                                     | [`SupervisorConfig`]                |
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use logicvisor::{
//!     Bus, Context, Dispatcher, Event, Gate, InterceptFn, LogicDef, ProcessFn, Store,
//!     Supervisor, SupervisorConfig,
//! };
//! use serde_json::{json, Value};
//!
//! struct Pipeline;
//! impl Store for Pipeline {
//!     fn dispatch(&self, event: Event) { println!("-> {}", event.tag); }
//!     fn state(&self) -> Value { Value::Null }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let search = LogicDef::new(
//!         "search",
//!         "SEARCH",
//!         ProcessFn::arc(|ctx: Context, out: Dispatcher| async move {
//!             let query = ctx.event().payload.clone();
//!             out.dispatch(json!({ "results": [], "query": query }));
//!             Ok(None)
//!         }),
//!     )
//!     .with_take_latest(true)
//!     .with_debounce(std::time::Duration::from_millis(300))
//!     .with_validate(InterceptFn::arc(|ctx: Context, gate: Gate| async move {
//!         if ctx.event().payload.is_null() {
//!             gate.reject(None); // empty query: drop it
//!         } else {
//!             let ev = ctx.event().clone();
//!             gate.allow(Some(ev));
//!         }
//!     }))
//!     .with_success_tag("SEARCH_OK")
//!     .with_fail_tag("SEARCH_FAILED");
//!
//!     let sup = Supervisor::new(SupervisorConfig::default(), Arc::new(Pipeline));
//!     let bus = Bus::new(1024);
//!     let mut output = sup.run(vec![search], &bus);
//!
//!     bus.publish(Event::new("SEARCH").with_payload(json!("tokio")));
//!     while let Some(ev) = output.recv().await {
//!         println!("pass-through: {}", ev.tag);
//!     }
//! }
//! ```

mod core;
mod error;
mod events;
mod logic;
mod monitor;

// ---- Public re-exports ----

pub use core::{
    DispatchOptions, DispatchValue, Dispatcher, Gate, GateOptions, Supervisor, SupervisorConfig,
    UseDispatch,
};
pub use error::{LogicError, RuntimeError};
pub use events::{Bus, Event, TagPattern, UNHANDLED_ERROR_TAG};
pub use logic::{
    Context, Deps, Intercept, InterceptFn, InterceptRef, LogicDef, Process, ProcessFn, ProcessRef,
    Store, WrapTag,
};
pub use monitor::{LogWriter, MonitorHub, MonitorNote, MonitorOp, Subscribe, SubscriberSet};
