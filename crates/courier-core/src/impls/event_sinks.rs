//! EventSink implementations.

use tokio::sync::broadcast;

use crate::domain::QueueEvent;
use crate::ports::EventSink;

/// Drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn emit(&self, _event: QueueEvent) {}
}

/// Fans events out to any number of subscribers.
///
/// Slow subscribers lag (and miss events) instead of blocking the queue.
#[derive(Debug, Clone)]
pub struct BroadcastEventSink {
    tx: broadcast::Sender<QueueEvent>,
}

impl BroadcastEventSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastEventSink {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventSink for BroadcastEventSink {
    fn emit(&self, event: QueueEvent) {
        // no subscribers is fine
        let _ = self.tx.send(event);
    }
}

/// Writes each event to the `courier::events` tracing target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: QueueEvent) {
        let id = event.operation_id().map(|id| id.to_string());
        tracing::info!(
            target: "courier::events",
            event = event.name(),
            operation_id = id.as_deref().unwrap_or("-"),
            at = %event.at(),
            "queue event"
        );
    }
}
