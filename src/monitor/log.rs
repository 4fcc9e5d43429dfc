//! # Reference logging subscriber.
//!
//! [`LogWriter`] emits one `tracing` record per monitor note, useful for
//! development and demos. Production observers (metrics, audit trails)
//! should implement [`Subscribe`] directly.

use async_trait::async_trait;

use super::note::{MonitorNote, MonitorOp};
use super::subscriber::Subscribe;

/// Simple tracing-backed monitor subscriber.
#[derive(Default)]
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_note(&self, note: &MonitorNote) {
        let logic = &*note.logic;
        let source = note.source.tag.as_str();
        match note.op {
            MonitorOp::Begin => {
                tracing::debug!(logic, source, "begin");
            }
            MonitorOp::Next => {
                let derived = note.derived.as_ref().map(|e| e.tag.as_str());
                tracing::debug!(logic, source, ?derived, "next");
            }
            MonitorOp::Filtered => {
                tracing::debug!(logic, source, should_process = ?note.should_process, "filtered");
            }
            MonitorOp::NextDisp => {
                let derived = note.derived.as_ref().map(|e| e.tag.as_str());
                tracing::debug!(logic, source, ?derived, "next-dispatch");
            }
            MonitorOp::Dispatch => {
                let derived = note.derived.as_ref().map(|e| e.tag.as_str());
                tracing::info!(logic, source, ?derived, "dispatch");
            }
            MonitorOp::Cancelled => {
                tracing::info!(logic, source, "cancelled");
            }
            MonitorOp::DispCancelled => {
                tracing::info!(logic, source, "dispatch-cancelled");
            }
            MonitorOp::End => {
                tracing::debug!(logic, source, "end");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
