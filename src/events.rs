//! Messages marshalled from worker tasks back to the coordination thread.
//!
//! Workers never touch presentation state directly. They mutate the fit state
//! store and push a `UiEvent`; only the coordination loop consumes them.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// One request/response exchange (or a free-form progress line).
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub at: DateTime<Utc>,
    pub message: String,
}

impl LogEntry {
    pub fn now(message: impl Into<String>) -> Self {
        Self {
            at: Utc::now(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum UiEvent {
    Log(LogEntry),
    /// Pretty-printed request about to be sent, with its sequence number.
    RequestPreview(String),
    /// Pretty-printed response of a manual send.
    ResponseReady(String),
    Error(String),
    /// Next sequence number the client will use.
    SequenceUpdated(u64),
    Connection { connected: bool, url: String },
    ConfigSaved(PathBuf),
    OutputsChanged,
    BandViewsChanged,
    GainAtValue { index: usize, value: f64 },
    /// SVG document of a rendered chart.
    ChartRendered(String),
}

pub type EventSender = UnboundedSender<UiEvent>;
pub type EventReceiver = UnboundedReceiver<UiEvent>;

pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Send without caring whether the coordination loop is still listening.
pub fn emit(events: &EventSender, event: UiEvent) {
    if events.send(event).is_err() {
        tracing::debug!("Event dropped: coordination loop has shut down");
    }
}
