//! Events: data model, tag matching, and the broadcast bus.
//!
//! This module groups the event **data model**, the **tag matcher** used to
//! route events to logic definitions, and the **bus** the host publishes raw
//! events into.
//!
//! ## Contents
//! - [`Event`] tagged, immutable message with an arbitrary JSON payload
//! - [`TagPattern`] exact / wildcard / any-of / regex matching on event tags
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: the host pipeline (via [`Bus::publish`]).
//! - **Consumers**: one bridge per [`Supervisor::run`](crate::Supervisor::run)
//!   call, which feeds the chain of logic flows.

mod bus;
mod event;
mod matcher;

pub use bus::Bus;
pub use event::{Event, UNHANDLED_ERROR_TAG};
pub use matcher::TagPattern;
