//! Error types used by the logicvisor runtime and logic hooks.
//!
//! This module defines two main error enums:
//!
//! - [`RuntimeError`] — errors raised by the supervision runtime itself.
//! - [`LogicError`] — the error plane of process hooks: values that travel
//!   through fail-wrapping and surface downstream as error events.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for
//! logging/metrics.

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use crate::events::Event;

/// # Errors produced by the supervision runtime.
///
/// These represent failures in the orchestration system itself,
/// such as a shutdown sequence exceeding its grace period.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; some logic actors were still live.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Names of logic definitions that still had live actors.
        stuck: Vec<String>,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::GraceExceeded { grace, stuck } => {
                format!("grace exceeded after {grace:?}; stuck logic={stuck:?}")
            }
        }
    }
}

/// # Error values flowing out of process hooks.
///
/// A `LogicError` is not a crash: it is data on the error plane of the
/// dispatch channel. Whatever its shape, it is converted into an outgoing
/// event by fail-wrapping (the logic's `fail_tag`, the pre-built event's own
/// tag, or the generic unhandled wrapper) and delivered downstream.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LogicError {
    /// Plain failure message.
    #[error("process failed: {0}")]
    Fail(String),

    /// Arbitrary error payload (string, object, number...).
    #[error("process failed with payload")]
    Payload(Value),

    /// A pre-built error event, forwarded as-is when no `fail_tag` is set.
    #[error("error event: {}", .0.tag)]
    Event(Event),
}

impl LogicError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            LogicError::Fail(_) => "logic_fail",
            LogicError::Payload(_) => "logic_payload",
            LogicError::Event(_) => "logic_event",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            LogicError::Fail(msg) => format!("fail: {msg}"),
            LogicError::Payload(v) => format!("payload: {v}"),
            LogicError::Event(ev) => format!("event: {}", ev.tag),
        }
    }

    /// The raw value handed to a configured `fail_tag` wrapper.
    pub(crate) fn into_payload(self) -> Value {
        match self {
            LogicError::Fail(msg) => Value::String(msg),
            LogicError::Payload(v) => v,
            LogicError::Event(ev) => serde_json::to_value(ev).unwrap_or(Value::Null),
        }
    }
}

impl From<String> for LogicError {
    fn from(msg: String) -> Self {
        LogicError::Fail(msg)
    }
}

impl From<&str> for LogicError {
    fn from(msg: &str) -> Self {
        LogicError::Fail(msg.to_string())
    }
}
