//! # The per-actor dispatch channel.
//!
//! The process hook emits values through a [`Dispatcher`]. Values are
//! [`DispatchValue`]s — an explicit tagged variant resolved by one exhaustive
//! match, instead of sniffing the shape of whatever arrives:
//!
//! - `Event` / `Value`: a single item on the success plane
//! - `Error`: an item on the error plane (terminates the channel downstream)
//! - `Stream` / `Pending`: lazy sources; each produced item is dispatched
//!   individually, errors route through fail-wrapping
//!
//! ## Channel lifetime
//! The channel closes exactly once, on the first of:
//! - a dispatch without `allow_more` while `dispatch_multiple` is off,
//! - [`Dispatcher::done`],
//! - gate rejection (force-close by the actor).
//!
//! Lazy sources keep their own sender clones, so the actor observes
//! completion only when the user side has closed **and** every pending
//! source has finished — overlapping sources merge, none is lost.
//!
//! Dispatching after closure is a protocol violation: the value is not
//! delivered and a warning is logged.

use std::fmt;
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::{Future, Stream, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::LogicError;
use crate::events::Event;

/// A value admitted into the dispatch channel.
pub enum DispatchValue {
    /// A complete event.
    Event(Event),
    /// A raw payload, subject to success wrapping.
    Value(Value),
    /// An error value, routed through fail-wrapping.
    Error(LogicError),
    /// A lazy stream of payloads; items dispatch individually as produced.
    Stream(BoxStream<'static, Result<Value, LogicError>>),
    /// A single payload that is not ready yet.
    Pending(BoxFuture<'static, Result<Value, LogicError>>),
}

impl DispatchValue {
    /// Boxes a stream of payload results.
    pub fn stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Value, LogicError>> + Send + 'static,
    {
        DispatchValue::Stream(stream.boxed())
    }

    /// Boxes a future payload result.
    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = Result<Value, LogicError>> + Send + 'static,
    {
        DispatchValue::Pending(Box::pin(future))
    }
}

impl fmt::Debug for DispatchValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchValue::Event(ev) => f.debug_tuple("Event").field(ev).finish(),
            DispatchValue::Value(v) => f.debug_tuple("Value").field(v).finish(),
            DispatchValue::Error(e) => f.debug_tuple("Error").field(e).finish(),
            DispatchValue::Stream(_) => f.write_str("Stream(..)"),
            DispatchValue::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

impl From<Event> for DispatchValue {
    fn from(ev: Event) -> Self {
        DispatchValue::Event(ev)
    }
}

impl From<Value> for DispatchValue {
    fn from(v: Value) -> Self {
        DispatchValue::Value(v)
    }
}

impl From<LogicError> for DispatchValue {
    fn from(e: LogicError) -> Self {
        DispatchValue::Error(e)
    }
}

/// Options accepted by [`Dispatcher::dispatch_with`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DispatchOptions {
    /// Keep the channel open after this dispatch even when the definition
    /// does not set `dispatch_multiple`.
    pub allow_more: bool,
}

/// One item flowing out of the channel, as seen by the actor.
#[derive(Debug)]
pub(crate) enum Outflow {
    /// Gate-originated event: forwarded as-is, bypasses wrapping.
    Intercept(Event),
    /// Success plane, complete event.
    Event(Event),
    /// Success plane, raw payload.
    Value(Value),
    /// Error plane; terminates the channel after delivery.
    Error(LogicError),
}

struct DispatcherInner {
    logic: Arc<str>,
    /// `None` once the user side is closed. Lazy-source tasks hold their own
    /// sender clones, so closing here does not cut them off.
    tx: Mutex<Option<mpsc::UnboundedSender<Outflow>>>,
    multiple: bool,
    cancel: CancellationToken,
}

/// Handle through which the process hook emits values.
///
/// Cheap to clone; all clones share one channel.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

impl Dispatcher {
    pub(crate) fn new(
        logic: Arc<str>,
        tx: mpsc::UnboundedSender<Outflow>,
        multiple: bool,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                logic,
                tx: Mutex::new(Some(tx)),
                multiple,
                cancel,
            }),
        }
    }

    /// Admits one value, then closes the channel unless the definition sets
    /// `dispatch_multiple`.
    pub fn dispatch(&self, value: impl Into<DispatchValue>) {
        self.dispatch_with(value, DispatchOptions::default());
    }

    /// Admits one value with explicit options.
    pub fn dispatch_with(&self, value: impl Into<DispatchValue>, opts: DispatchOptions) {
        let mut guard = self.inner.tx.lock().expect("dispatch channel poisoned");
        let Some(tx) = guard.as_ref() else {
            tracing::warn!(
                logic = &*self.inner.logic,
                "dispatch after channel closed; value dropped"
            );
            return;
        };
        self.send(tx, value.into());
        if !(self.inner.multiple || opts.allow_more) {
            *guard = None;
        }
    }

    /// Closes the channel: no more dispatches will be admitted.
    ///
    /// Used with `dispatch_multiple` to signal "no more"; harmless when the
    /// channel already closed.
    pub fn done(&self) {
        *self.inner.tx.lock().expect("dispatch channel poisoned") = None;
    }

    /// Gate-originated event; keeps the channel open (the process decides
    /// when to close).
    pub(crate) fn dispatch_intercept(&self, event: Event) {
        let guard = self.inner.tx.lock().expect("dispatch channel poisoned");
        if let Some(tx) = guard.as_ref() {
            let _ = tx.send(Outflow::Intercept(event));
        }
    }

    /// Force-close, used by the actor on gate rejection.
    pub(crate) fn close(&self) {
        self.done();
    }

    fn send(&self, tx: &mpsc::UnboundedSender<Outflow>, value: DispatchValue) {
        match value {
            DispatchValue::Event(ev) => {
                let _ = tx.send(Outflow::Event(ev));
            }
            DispatchValue::Value(v) => {
                let _ = tx.send(Outflow::Value(v));
            }
            DispatchValue::Error(e) => {
                let _ = tx.send(Outflow::Error(e));
            }
            DispatchValue::Stream(mut stream) => {
                let tx = tx.clone();
                let cancel = self.inner.cancel.clone();
                tokio::spawn(async move {
                    loop {
                        tokio::select! {
                            biased;
                            _ = cancel.cancelled() => break,
                            item = stream.next() => match item {
                                Some(Ok(v)) => {
                                    if tx.send(Outflow::Value(v)).is_err() {
                                        break;
                                    }
                                }
                                Some(Err(e)) => {
                                    let _ = tx.send(Outflow::Error(e));
                                    break;
                                }
                                None => break,
                            },
                        }
                    }
                });
            }
            DispatchValue::Pending(future) => {
                let tx = tx.clone();
                let cancel = self.inner.cancel.clone();
                tokio::spawn(async move {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {}
                        result = future => {
                            let outflow = match result {
                                Ok(v) => Outflow::Value(v),
                                Err(e) => Outflow::Error(e),
                            };
                            let _ = tx.send(outflow);
                        }
                    }
                });
            }
        }
    }
}
