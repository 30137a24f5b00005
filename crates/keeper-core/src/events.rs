use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::Timestamp;

/// Note attached to the event that closes every batch.
pub const BATCH_COMPLETE: &str = "batch complete";

/// A normalized progress update for one scan tick.
///
/// `progress` is a percentage in `0.0..=100.0` of the batch snapshot taken
/// at the start of the tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub tick_id: Uuid,
    pub task_name: String,
    pub progress: f64,
    pub timestamp: Timestamp,
    pub note: String,
}

impl ProgressEvent {
    pub fn new(tick_id: Uuid, task_name: &str, progress: f64, note: impl Into<String>) -> Self {
        Self {
            tick_id,
            task_name: task_name.to_string(),
            progress: progress.clamp(0.0, 100.0),
            timestamp: Timestamp::now(),
            note: note.into(),
        }
    }

    pub fn is_batch_complete(&self) -> bool {
        self.progress >= 100.0 && self.note == BATCH_COMPLETE
    }
}
