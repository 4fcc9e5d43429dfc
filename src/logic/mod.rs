//! Logic definitions and their hook surface.
//!
//! This module provides the configuration and extension points owned by the
//! registering party:
//! - [`LogicDef`] — read-only configuration bundle for one supervised logic
//! - [`Process`] / [`ProcessFn`] — the side-effect procedure run per event
//! - [`Intercept`] / [`InterceptFn`] — the optional validate/transform gate
//! - [`Context`] — per-actor view handed into every hook
//! - [`Store`] — the host dispatch sink boundary
//! - [`WrapTag`] — success/fail wrapping policy

mod context;
mod def;
mod hooks;

pub use context::{Context, Deps, Store};
pub use def::{LogicDef, WrapTag};
pub use hooks::{Intercept, InterceptFn, InterceptRef, Process, ProcessFn, ProcessRef};
