//! # The event record flowing through the pipeline.
//!
//! An [`Event`] is a tagged, immutable message: a `tag` discriminator, an
//! arbitrary JSON `payload`, and an `error` marker. Identity is structural —
//! a derived event is a new `Event`, never a mutation of the source.
//!
//! ## Example
//! ```rust
//! use logicvisor::Event;
//! use serde_json::json;
//!
//! let ev = Event::new("FETCH").with_payload(json!({ "id": 7 }));
//! assert_eq!(ev.tag, "FETCH");
//! assert!(!ev.error);
//!
//! let failed = Event::error("FETCH_FAILED", json!("timeout"));
//! assert!(failed.error);
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tag of the generic wrapper event produced when an error value reaches the
/// dispatch channel and no `fail_tag` (or recognizable error event) can route
/// it. Guarantees every process-path failure is observable downstream.
pub const UNHANDLED_ERROR_TAG: &str = "UNHANDLED_LOGIC_ERROR";

/// A tagged, immutable message.
///
/// ### Fields
/// - `tag`: discriminator used for matching against logic definitions
/// - `payload`: arbitrary JSON value (defaults to `null`)
/// - `error`: marker distinguishing failure events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Discriminator used for matching.
    pub tag: String,
    /// Arbitrary payload.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub payload: Value,
    /// Marks failure events.
    #[serde(default, skip_serializing_if = "is_false")]
    pub error: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl Event {
    /// Creates a new event with a `null` payload.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            payload: Value::Null,
            error: false,
        }
    }

    /// Creates an error-marked event.
    pub fn error(tag: impl Into<String>, payload: Value) -> Self {
        Self {
            tag: tag.into(),
            payload,
            error: true,
        }
    }

    /// Creates the generic unhandled-error wrapper around a raw value.
    pub fn unhandled(payload: Value) -> Self {
        Self::error(UNHANDLED_ERROR_TAG, payload)
    }

    /// Attaches a payload.
    #[inline]
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    /// Marks the event as an error.
    #[inline]
    pub fn with_error(mut self) -> Self {
        self.error = true;
        self
    }

    /// Reinterprets a raw JSON value as an event.
    ///
    /// Succeeds for objects carrying a string `tag` field; `payload` and
    /// `error` default when absent.
    pub fn from_value(value: Value) -> Option<Self> {
        serde_json::from_value(value).ok()
    }

    /// Serializes the event back into a raw JSON value.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
