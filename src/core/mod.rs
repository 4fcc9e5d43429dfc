//! Runtime core: per-event supervision and composition.
//!
//! This module contains the embedded implementation of the logicvisor
//! engine. The system-level wiring:
//!
//! ```text
//! Bus ──► bridge ──► LogicFlow #1 ──► LogicFlow #2 ──► ... ──► output
//!                        │
//!                        ├── cancel feed (raw): CancelSignal::fire()
//!                        ├── matched ──► limiter (debounce → throttle)
//!                        │                   │
//!                        │                   ▼ admitted
//!                        │            LogicActor (one per event)
//!                        │              ├─ gate: allow/reject
//!                        │              ├─ process ─► Dispatcher ─► channel
//!                        │              ├─ wrap ─► Store::dispatch
//!                        │              └─ MonitorHub notes
//!                        └── unmatched ──► stage output (pass-through)
//! ```
//!
//! Internal modules:
//! - [`supervisor`]: owns config/store/deps/monitor, builds the flow chain,
//!   graceful shutdown;
//! - [`flow`]: per-definition stream transformer (split, cancel feed,
//!   limiter, admission, merge);
//! - [`actor`]: the per-event lifecycle state machine;
//! - [`dispatch`]: dispatch values, the per-actor channel, the dispatcher
//!   handle;
//! - [`gate`]: the allow/reject decision surface of the intercept hook;
//! - [`limiter`]: debounce/throttle admission stages;
//! - [`cancel`]: the per-definition cancellation hub;
//! - [`config`]: supervisor-wide settings.

mod actor;
mod cancel;
mod config;
mod dispatch;
mod flow;
mod gate;
mod limiter;
mod supervisor;

pub use config::SupervisorConfig;
pub use dispatch::{DispatchOptions, DispatchValue, Dispatcher};
pub use gate::{Gate, GateOptions, UseDispatch};
pub use supervisor::Supervisor;
