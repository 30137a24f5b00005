//! Notifier that writes alerts to the log.

use async_trait::async_trait;

use keeper_core::ports::Notifier;

/// Emits each message as an `info` event under a fixed target, so alerts
/// can be filtered out of the general log stream.
pub struct LogNotifier {
    channel: String,
}

impl LogNotifier {
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }
}

impl Default for LogNotifier {
    fn default() -> Self {
        Self::new("keeper")
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, message: &str) {
        if message.trim().is_empty() {
            tracing::debug!(channel = %self.channel, "Skipping empty notification");
            return;
        }
        tracing::info!(target: "keeper::notify", channel = %self.channel, "{}", message);
    }
}
