//! Cooldown between submitted nominations.

use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

/// Timer-based rate limiter for submissions.
///
/// After [`mark`](Self::mark) is called, [`wait_turn`](Self::wait_turn)
/// sleeps until the cooldown has elapsed. Actions that never submit are
/// not delayed.
pub struct ExecutionPacer {
    cooldown: Duration,
    last_submission: Mutex<Option<Instant>>,
}

impl ExecutionPacer {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_submission: Mutex::new(None),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Record that a submission just happened.
    pub fn mark(&self) {
        if let Ok(mut last) = self.last_submission.lock() {
            *last = Some(Instant::now());
        }
    }

    /// Time left before the next submission may start.
    pub fn remaining(&self) -> Duration {
        let last = match self.last_submission.lock() {
            Ok(last) => *last,
            Err(_) => return Duration::ZERO,
        };
        match last {
            Some(at) => (at + self.cooldown).saturating_duration_since(Instant::now()),
            None => Duration::ZERO,
        }
    }

    /// Sleep until the cooldown after the previous submission has passed.
    pub async fn wait_turn(&self) {
        let remaining = self.remaining();
        if !remaining.is_zero() {
            tracing::debug!(remaining_ms = remaining.as_millis() as u64, "Execution cooldown");
            tokio::time::sleep(remaining).await;
        }
    }
}
