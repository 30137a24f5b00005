//! Flood protection for notifiers.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use keeper_core::ports::Notifier;

const WINDOW: Duration = Duration::from_secs(60);

/// Token bucket allowing `max_per_minute` messages per rolling window.
pub struct NotificationRateLimiter {
    max_per_minute: u32,
    tokens: Mutex<(u32, Instant)>,
}

impl NotificationRateLimiter {
    pub fn new(max_per_minute: u32) -> Self {
        Self {
            max_per_minute,
            tokens: Mutex::new((max_per_minute, Instant::now())),
        }
    }

    /// Take a token. Returns `false` when the bucket is empty.
    pub fn try_acquire(&self) -> bool {
        let Ok(mut state) = self.tokens.lock() else {
            return false;
        };
        if state.1.elapsed() >= WINDOW {
            state.0 = self.max_per_minute;
            state.1 = Instant::now();
        }
        if state.0 > 0 {
            state.0 -= 1;
            true
        } else {
            false
        }
    }
}

/// Forwards to an inner notifier while the limiter has tokens; excess
/// messages are dropped.
pub struct RateLimitedNotifier {
    inner: Arc<dyn Notifier>,
    limiter: NotificationRateLimiter,
}

impl RateLimitedNotifier {
    pub fn new(inner: Arc<dyn Notifier>, max_per_minute: u32) -> Self {
        Self {
            inner,
            limiter: NotificationRateLimiter::new(max_per_minute),
        }
    }
}

#[async_trait]
impl Notifier for RateLimitedNotifier {
    async fn notify(&self, message: &str) {
        if self.limiter.try_acquire() {
            self.inner.notify(message).await;
        } else {
            tracing::debug!(message = %message, "Notification dropped by rate limiter");
        }
    }
}
