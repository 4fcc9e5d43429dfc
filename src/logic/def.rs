//! # Logic definition: configuration for one supervised logic.
//!
//! A [`LogicDef`] bundles everything the engine needs to supervise one kind
//! of event: the match/cancel patterns, admission policy (take-latest,
//! debounce, throttle), the hooks, and the dispatch policy (success/fail
//! wrapping, single vs. multiple dispatch, return-value dispatch).
//!
//! The definition is read-only for the engine's lifetime; it is built once
//! with [`LogicDef::new`] plus `with_*` modifiers and handed to
//! [`Supervisor::run`](crate::Supervisor::run).
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use logicvisor::{Context, Dispatcher, LogicDef, ProcessFn};
//! use serde_json::json;
//!
//! let fetch = LogicDef::new(
//!     "fetch-users",
//!     "USERS_FETCH",
//!     ProcessFn::arc(|_ctx: Context, out: Dispatcher| async move {
//!         out.dispatch(json!([ "alice", "bob" ]));
//!         Ok(None)
//!     }),
//! )
//! .with_cancel_tag("USERS_FETCH_CANCEL")
//! .with_take_latest(true)
//! .with_success_tag("USERS_FETCH_OK")
//! .with_fail_tag("USERS_FETCH_FAILED")
//! .with_warn_timeout(Some(Duration::from_secs(30)));
//! # let _ = fetch;
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::events::{Event, TagPattern};
use crate::logic::hooks::{InterceptRef, ProcessRef};

/// Default diagnostic window before the warn timer reports a still-running
/// actor. Matches the conventional "did you forget to call done()?" horizon.
const DEFAULT_WARN_TIMEOUT: Duration = Duration::from_secs(60);

/// Success/fail wrapping policy for dispatched values.
///
/// Either a plain tag (the value becomes the new event's payload) or an
/// event-constructing closure. On the fail path a closure returning `None`
/// suppresses the dispatch.
#[derive(Clone)]
pub enum WrapTag {
    /// Wrap the value under this tag.
    Tag(String),
    /// Build the outgoing event from the value.
    With(Arc<dyn Fn(Value) -> Option<Event> + Send + Sync>),
}

impl WrapTag {
    /// Creates a constructing wrapper from a closure.
    pub fn with<F>(f: F) -> Self
    where
        F: Fn(Value) -> Option<Event> + Send + Sync + 'static,
    {
        WrapTag::With(Arc::new(f))
    }

    /// Applies the policy to a raw value.
    pub(crate) fn apply(&self, payload: Value, err: bool) -> Option<Event> {
        match self {
            WrapTag::Tag(tag) => {
                let ev = Event::new(tag.clone()).with_payload(payload);
                Some(if err { ev.with_error() } else { ev })
            }
            WrapTag::With(f) => f(payload),
        }
    }
}

impl fmt::Debug for WrapTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WrapTag::Tag(tag) => f.debug_tuple("Tag").field(tag).finish(),
            WrapTag::With(_) => f.debug_tuple("With").field(&"<fn>").finish(),
        }
    }
}

impl From<&str> for WrapTag {
    fn from(tag: &str) -> Self {
        WrapTag::Tag(tag.to_string())
    }
}

impl From<String> for WrapTag {
    fn from(tag: String) -> Self {
        WrapTag::Tag(tag)
    }
}

/// Configuration for one supervised logic.
#[derive(Clone)]
pub struct LogicDef {
    name: Arc<str>,
    match_tag: TagPattern,
    cancel_tag: Option<TagPattern>,
    take_latest: bool,
    debounce: Option<Duration>,
    throttle: Option<Duration>,
    warn_timeout: Option<Duration>,
    intercept: Option<InterceptRef>,
    process: ProcessRef,
    success_tag: Option<WrapTag>,
    fail_tag: Option<WrapTag>,
    dispatch_return: bool,
    dispatch_multiple: bool,
}

impl LogicDef {
    /// Creates a definition with defaults:
    ///
    /// - no cancel tag, no take-latest, no debounce/throttle
    /// - no intercept (events auto-allow and pass through)
    /// - no success/fail wrapping
    /// - single dispatch (`dispatch_multiple = false`)
    /// - warn timeout of 60 s
    pub fn new(
        name: impl Into<Arc<str>>,
        match_tag: impl Into<TagPattern>,
        process: ProcessRef,
    ) -> Self {
        Self {
            name: name.into(),
            match_tag: match_tag.into(),
            cancel_tag: None,
            take_latest: false,
            debounce: None,
            throttle: None,
            warn_timeout: Some(DEFAULT_WARN_TIMEOUT),
            intercept: None,
            process,
            success_tag: None,
            fail_tag: None,
            dispatch_return: false,
            dispatch_multiple: false,
        }
    }

    /// Events matching this pattern cancel the definition's in-flight actors.
    pub fn with_cancel_tag(mut self, pattern: impl Into<TagPattern>) -> Self {
        self.cancel_tag = Some(pattern.into());
        self
    }

    /// A newer matching event cancels the previous in-flight actor.
    pub fn with_take_latest(mut self, latest: bool) -> Self {
        self.take_latest = latest;
        self
    }

    /// Trailing debounce window applied to the matched sub-stream.
    pub fn with_debounce(mut self, window: Duration) -> Self {
        self.debounce = Some(window);
        self
    }

    /// Leading-edge throttle window applied to the matched sub-stream.
    pub fn with_throttle(mut self, window: Duration) -> Self {
        self.throttle = Some(window);
        self
    }

    /// Diagnostic window for still-running actors; `None` disables the timer.
    pub fn with_warn_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.warn_timeout = timeout;
        self
    }

    /// Installs the validate hook (the intercept gate).
    pub fn with_validate(mut self, intercept: InterceptRef) -> Self {
        self.intercept = Some(intercept);
        self
    }

    /// Installs the transform hook. Alias of [`with_validate`]: validate and
    /// transform are the same gate, named for intent.
    ///
    /// [`with_validate`]: LogicDef::with_validate
    pub fn with_transform(self, intercept: InterceptRef) -> Self {
        self.with_validate(intercept)
    }

    /// Wraps success-path values under this tag/constructor.
    pub fn with_success_tag(mut self, tag: impl Into<WrapTag>) -> Self {
        self.success_tag = Some(tag.into());
        self
    }

    /// Wraps error-path values under this tag/constructor.
    pub fn with_fail_tag(mut self, tag: impl Into<WrapTag>) -> Self {
        self.fail_tag = Some(tag.into());
        self
    }

    /// Treats the process return value as one more dispatch.
    pub fn with_dispatch_return(mut self, on: bool) -> Self {
        self.dispatch_return = on;
        self
    }

    /// Keeps the dispatch channel open until [`Dispatcher::done`] is called.
    ///
    /// [`Dispatcher::done`]: crate::Dispatcher::done
    pub fn with_dispatch_multiple(mut self, on: bool) -> Self {
        self.dispatch_multiple = on;
        self
    }

    /// Definition name, used in diagnostics and monitor notes.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn name_arc(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    /// Pattern admitting events into this logic.
    pub fn match_tag(&self) -> &TagPattern {
        &self.match_tag
    }

    /// Pattern feeding the cancel hub, if configured.
    pub fn cancel_tag(&self) -> Option<&TagPattern> {
        self.cancel_tag.as_ref()
    }

    /// Whether a newer matching event cancels the previous actor.
    pub fn take_latest(&self) -> bool {
        self.take_latest
    }

    /// Debounce window, if configured.
    pub fn debounce(&self) -> Option<Duration> {
        self.debounce
    }

    /// Throttle window, if configured.
    pub fn throttle(&self) -> Option<Duration> {
        self.throttle
    }

    /// Warn timer window, if enabled.
    pub fn warn_timeout(&self) -> Option<Duration> {
        self.warn_timeout
    }

    pub(crate) fn intercept(&self) -> Option<&InterceptRef> {
        self.intercept.as_ref()
    }

    pub(crate) fn process(&self) -> &ProcessRef {
        &self.process
    }

    pub(crate) fn success_tag(&self) -> Option<&WrapTag> {
        self.success_tag.as_ref()
    }

    pub(crate) fn fail_tag(&self) -> Option<&WrapTag> {
        self.fail_tag.as_ref()
    }

    pub(crate) fn dispatch_return(&self) -> bool {
        self.dispatch_return
    }

    pub(crate) fn dispatch_multiple(&self) -> bool {
        self.dispatch_multiple
    }

    /// True when `tag` should feed this definition's cancel hub: the cancel
    /// pattern, plus the match pattern itself under take-latest.
    pub(crate) fn cancels_on(&self, tag: &str) -> bool {
        if let Some(p) = &self.cancel_tag {
            if p.matches(tag) {
                return true;
            }
        }
        self.take_latest && self.match_tag.matches(tag)
    }
}

impl fmt::Debug for LogicDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogicDef")
            .field("name", &self.name)
            .field("match_tag", &self.match_tag)
            .field("cancel_tag", &self.cancel_tag)
            .field("take_latest", &self.take_latest)
            .field("debounce", &self.debounce)
            .field("throttle", &self.throttle)
            .field("warn_timeout", &self.warn_timeout)
            .field("dispatch_return", &self.dispatch_return)
            .field("dispatch_multiple", &self.dispatch_multiple)
            .finish_non_exhaustive()
    }
}
