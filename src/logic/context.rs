//! # Per-actor context handed into logic hooks.
//!
//! A [`Context`] is the hook-facing view of one logic actor: the effective
//! event, the injected dependencies, the host state accessor, a cooperative
//! cancellation token, and scratch storage shared between the intercept and
//! process hooks of the same actor.
//!
//! The intercept hook sees the triggering event; the process hook sees the
//! effective event (the intercept's replacement, or the original when the
//! intercept forwarded nothing).
//!
//! ## Example
//! ```rust,no_run
//! # use logicvisor::{Context, Dispatcher, DispatchValue, LogicError};
//! # use serde_json::json;
//! async fn process(ctx: Context, out: Dispatcher) -> Result<Option<DispatchValue>, LogicError> {
//!     if ctx.cancelled().is_cancelled() {
//!         return Ok(None);
//!     }
//!     let id = ctx.event().payload.clone();
//!     ctx.scratch_insert("seen", id);
//!     out.dispatch(json!({ "done": true }));
//!     Ok(None)
//! }
//! ```

use std::any::Any;
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::events::Event;

/// Opaque dependency-injection handle, passed through untouched into every
/// context. Downcast with [`Context::deps`].
pub type Deps = Arc<dyn Any + Send + Sync>;

/// Host dispatch sink boundary.
///
/// The supervisor delivers every wrapped outgoing event through
/// [`Store::dispatch`]; hooks read host state through [`Store::state`].
/// Implementations must not panic for well-formed events; writes are
/// serialized by the caller.
pub trait Store: Send + Sync + 'static {
    /// Accepts one outgoing event.
    fn dispatch(&self, event: Event);

    /// Returns a snapshot of the host state.
    fn state(&self) -> Value;
}

/// State shared between the hooks of one actor.
struct ContextShared {
    deps: Option<Deps>,
    store: Arc<dyn Store>,
    cancelled: CancellationToken,
    scratch: Mutex<Map<String, Value>>,
}

/// Hook-facing view of one logic actor.
///
/// Cheap to clone; clones share deps, store, cancellation, and scratch.
#[derive(Clone)]
pub struct Context {
    shared: Arc<ContextShared>,
    event: Event,
}

impl Context {
    pub(crate) fn new(
        deps: Option<Deps>,
        store: Arc<dyn Store>,
        cancelled: CancellationToken,
        event: Event,
    ) -> Self {
        Self {
            shared: Arc::new(ContextShared {
                deps,
                store,
                cancelled,
                scratch: Mutex::new(Map::new()),
            }),
            event,
        }
    }

    /// Same shared state, different effective event.
    pub(crate) fn with_event(&self, event: Event) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            event,
        }
    }

    /// The effective event for this hook invocation.
    pub fn event(&self) -> &Event {
        &self.event
    }

    /// Downcasts the injected dependencies to a concrete type.
    ///
    /// Returns `None` when no deps were injected or the type does not match.
    pub fn deps<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.shared.deps.clone()?.downcast::<T>().ok()
    }

    /// Snapshot of the host state.
    pub fn state(&self) -> Value {
        self.shared.store.state()
    }

    /// This actor's cooperative cancellation token.
    ///
    /// Level-triggered: fires at most once per actor. Long-running hooks
    /// should observe it and exit promptly; the engine suppresses further
    /// dispatches after it fires but cannot abort a hook mid-execution.
    pub fn cancelled(&self) -> &CancellationToken {
        &self.shared.cancelled
    }

    /// Stores a value in this actor's scratch storage.
    pub fn scratch_insert(&self, key: impl Into<String>, value: Value) {
        self.shared
            .scratch
            .lock()
            .expect("scratch lock poisoned")
            .insert(key.into(), value);
    }

    /// Reads a value from this actor's scratch storage.
    pub fn scratch_get(&self, key: &str) -> Option<Value> {
        self.shared
            .scratch
            .lock()
            .expect("scratch lock poisoned")
            .get(key)
            .cloned()
    }
}
