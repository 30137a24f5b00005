//! Notifier implementations.
//!
//! Notification is best-effort: implementations swallow their own failures
//! and never hold up the engine.

pub mod log;
pub mod rate_limited;

use async_trait::async_trait;

use keeper_core::ports::Notifier;

pub use log::LogNotifier;
pub use rate_limited::{NotificationRateLimiter, RateLimitedNotifier};

/// Drops every message.
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, _message: &str) {}
}
