use serde::Serialize;
use std::path::PathBuf;
use std::sync::mpsc::Sender;

/// Outbound notification from the erasure worker, in emission order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "value", rename_all = "snake_case")]
pub enum EraseEvent {
    /// Whole-batch completion, 0..=100.
    Progress(u8),
    /// Human-readable state description.
    Status(String),
    /// A directory is confirmed gone.
    FolderCompleted(PathBuf),
    /// Per-path or batch-level failure.
    Error(String),
    /// The batch completed without cancellation.
    Finished,
    /// The batch stopped because cancellation was requested.
    Cancelled,
}

impl EraseEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, EraseEvent::Finished | EraseEvent::Cancelled)
    }
}

/// Destination of the event stream, owned by the worker.
pub trait EventSink: Send {
    fn emit(&self, event: EraseEvent);
}

impl EventSink for Sender<EraseEvent> {
    fn emit(&self, event: EraseEvent) {
        // A dropped receiver only means nobody is watching; the batch goes on.
        let _ = self.send(event);
    }
}
