//! Progress sinks.
//!
//! The orchestrator reports through the [`ProgressSink`] trait. Emission is
//! synchronous and infallible from the caller's side: a sink that cannot
//! deliver drops the event and logs.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::debug;

use super::types::ProgressEvent;

/// Receiver of progress events for one or more pipeline runs.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

// ── Channel ─────────────────────────────────────────────────────────────────

/// Forwards events into an unbounded mpsc channel, e.g. toward a streaming
/// HTTP response.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl ProgressSink for ChannelSink {
    fn emit(&self, event: ProgressEvent) {
        if let Err(mpsc::error::SendError(event)) = self.sender.send(event) {
            debug!(event_type = event.event_type(), "Progress receiver dropped");
        }
    }
}

// ── Recording ───────────────────────────────────────────────────────────────

/// Keeps every event in memory. Used by tests and the CLI.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn terminal_count(&self) -> usize {
        self.events().iter().filter(|e| e.is_terminal()).count()
    }
}

impl ProgressSink for RecordingSink {
    fn emit(&self, event: ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl<S: ProgressSink + ?Sized> ProgressSink for Arc<S> {
    fn emit(&self, event: ProgressEvent) {
        (**self).emit(event)
    }
}
