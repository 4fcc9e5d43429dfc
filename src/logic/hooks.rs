//! # Hook traits and function-backed implementations.
//!
//! Logic behavior is supplied through two async traits:
//!
//! - [`Process`] — the side-effect procedure, run once per actor that passed
//!   the intercept gate. It emits values through a [`Dispatcher`] and/or via
//!   its return value (when the definition sets `dispatch_return`).
//! - [`Intercept`] — the optional validate/transform gate. It receives a
//!   [`Gate`] that must be resolved exactly once with `allow` or `reject`;
//!   move semantics make double resolution unrepresentable.
//!
//! [`ProcessFn`] and [`InterceptFn`] wrap closures, producing a fresh future
//! per invocation; shared state goes through `Arc` inside the closure.
//!
//! ## Example
//! ```rust
//! use logicvisor::{Context, Dispatcher, Gate, ProcessFn, ProcessRef, InterceptFn, InterceptRef};
//! use serde_json::json;
//!
//! let process: ProcessRef = ProcessFn::arc(|_ctx: Context, out: Dispatcher| async move {
//!     out.dispatch(json!(42));
//!     Ok(None)
//! });
//!
//! let validate: InterceptRef = InterceptFn::arc(|ctx: Context, gate: Gate| async move {
//!     if ctx.event().payload.is_null() {
//!         gate.reject(None);
//!     } else {
//!         let ev = ctx.event().clone();
//!         gate.allow(Some(ev));
//!     }
//! });
//! # let _ = (process, validate);
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::core::{DispatchValue, Dispatcher, Gate};
use crate::error::LogicError;
use crate::logic::context::Context;

/// Shared handle to a process hook.
pub type ProcessRef = Arc<dyn Process>;

/// Shared handle to an intercept hook.
pub type InterceptRef = Arc<dyn Intercept>;

/// # The side-effect procedure of a logic definition.
///
/// Runs on its own task; may perform async I/O and long waits. It must
/// eventually dispatch, call [`Dispatcher::done`], or return (under
/// `dispatch_return`) — otherwise the actor stays alive and only the warn
/// timer notices.
///
/// Errors returned here are routed through fail-wrapping exactly as if they
/// had been dispatched; they never crash the supervisor.
#[async_trait]
pub trait Process: Send + Sync + 'static {
    /// Executes the procedure for one actor.
    ///
    /// With `dispatch_return` set on the definition, `Ok(Some(value))`
    /// behaves like one more `out.dispatch(value)` and `Ok(None)` closes the
    /// dispatch channel.
    async fn run(&self, ctx: Context, out: Dispatcher) -> Result<Option<DispatchValue>, LogicError>;
}

/// # The optional validate/transform gate of a logic definition.
///
/// Invoked before processing; decides whether the actor proceeds
/// ([`Gate::allow`]) or stops ([`Gate::reject`]), and what event — if any —
/// is forwarded. Dropping the gate unresolved is a protocol violation,
/// diagnosed and treated as a terminal non-decision.
#[async_trait]
pub trait Intercept: Send + Sync + 'static {
    /// Inspects one event and resolves the gate.
    async fn run(&self, ctx: Context, gate: Gate);
}

/// Function-backed process hook.
///
/// Wraps a closure that *creates* a new future per actor.
pub struct ProcessFn<F> {
    f: F,
}

impl<F> ProcessFn<F> {
    /// Creates a new function-backed process hook.
    ///
    /// Prefer [`ProcessFn::arc`] when you immediately need a [`ProcessRef`].
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the hook and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<F, Fut> Process for ProcessFn<F>
where
    F: Fn(Context, Dispatcher) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<DispatchValue>, LogicError>> + Send + 'static,
{
    async fn run(&self, ctx: Context, out: Dispatcher) -> Result<Option<DispatchValue>, LogicError> {
        (self.f)(ctx, out).await
    }
}

/// Function-backed intercept hook.
pub struct InterceptFn<F> {
    f: F,
}

impl<F> InterceptFn<F> {
    /// Creates a new function-backed intercept hook.
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the hook and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<F, Fut> Intercept for InterceptFn<F>
where
    F: Fn(Context, Gate) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn run(&self, ctx: Context, gate: Gate) {
        (self.f)(ctx, gate).await
    }
}
