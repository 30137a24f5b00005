//! Progress reporting for scan ticks.
//!
//! The engine emits one event per processed action and a closing event
//! after the batch. Sinks are injected; delivery never blocks the engine.

use std::sync::Arc;

use tokio::sync::broadcast;
use uuid::Uuid;

use keeper_core::events::{ProgressEvent, BATCH_COMPLETE};
use keeper_core::ports::ProgressSink;

/// Task name carried by every event the execution engine emits.
pub const EXECUTION_TASK: &str = "execution";

/// Percentage of a batch finished after item `index` (zero-based).
pub fn percent_complete(index: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    ((index + 1) as f64 / total as f64 * 100.0).min(100.0)
}

/// Emits normalized progress for one tick over a fixed batch snapshot.
pub struct ProgressReporter {
    sink: Arc<dyn ProgressSink>,
    task_name: String,
    tick_id: Uuid,
    total: usize,
}

impl ProgressReporter {
    pub fn new(sink: Arc<dyn ProgressSink>, task_name: &str, tick_id: Uuid, total: usize) -> Self {
        Self {
            sink,
            task_name: task_name.to_string(),
            tick_id,
            total,
        }
    }

    pub fn item_done(&self, index: usize, note: impl Into<String>) {
        self.sink.emit(ProgressEvent::new(
            self.tick_id,
            &self.task_name,
            percent_complete(index, self.total),
            note,
        ));
    }

    pub fn batch_complete(&self) {
        self.sink.emit(ProgressEvent::new(
            self.tick_id,
            &self.task_name,
            100.0,
            BATCH_COMPLETE,
        ));
    }
}

/// Fans events out over a tokio broadcast channel.
///
/// Sending with no subscribers, or to lagging subscribers, is not an error.
#[derive(Clone)]
pub struct BroadcastProgressSink {
    tx: broadcast::Sender<ProgressEvent>,
}

impl BroadcastProgressSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.tx.subscribe()
    }
}

impl ProgressSink for BroadcastProgressSink {
    fn emit(&self, event: ProgressEvent) {
        let _ = self.tx.send(event);
    }
}

/// Writes events to the log.
pub struct TracingProgressSink;

impl ProgressSink for TracingProgressSink {
    fn emit(&self, event: ProgressEvent) {
        tracing::info!(
            task = %event.task_name,
            tick = %event.tick_id,
            progress = event.progress,
            note = %event.note,
            "Progress"
        );
    }
}

/// Discards events.
pub struct NoopProgressSink;

impl ProgressSink for NoopProgressSink {
    fn emit(&self, _event: ProgressEvent) {}
}
