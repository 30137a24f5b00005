//! Periodic scan driver.
//!
//! Fires one engine tick per interval, plus one per manual trigger. A tick
//! that is already running finishes before shutdown is observed, and a
//! trigger that arrives while it runs is dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;

use crate::engine::Engine;
use crate::types::TickOutcome;

/// Background loop that runs the engine on a fixed interval.
pub struct Scheduler {
    engine: Arc<Engine>,
    frequency: Duration,
    trigger: Arc<Notify>,
    shutdown: Arc<Notify>,
    scanning: AtomicBool,
}

impl Scheduler {
    pub fn new(engine: Arc<Engine>, frequency: Duration) -> Self {
        Self {
            engine,
            frequency,
            trigger: Arc::new(Notify::new()),
            shutdown: Arc::new(Notify::new()),
            scanning: AtomicBool::new(false),
        }
    }

    pub fn frequency(&self) -> Duration {
        self.frequency
    }

    /// Run until [`shutdown`](Self::shutdown) is called.
    ///
    /// The first scan starts immediately. Intervals missed while a tick was
    /// running are skipped, not replayed.
    pub async fn run(&self) {
        let mut interval = tokio::time::interval(self.frequency.max(Duration::from_millis(1)));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(frequency_secs = self.frequency.as_secs(), "Scheduler started");
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.notified() => {
                    tracing::info!("Scheduler stopped");
                    return;
                }
                _ = self.trigger.notified() => self.scan().await,
                _ = interval.tick() => self.scan().await,
            }
        }
    }

    /// Request a scan outside the regular interval. Ignored while a scan is
    /// in progress.
    pub fn trigger(&self) {
        if self.scanning.load(Ordering::SeqCst) {
            tracing::info!("Scan in progress, dropping trigger");
            return;
        }
        self.trigger.notify_one();
    }

    /// Signal the scheduler to stop after the current tick.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }

    async fn scan(&self) {
        self.scanning.store(true, Ordering::SeqCst);
        let result = self.engine.run_tick().await;
        self.scanning.store(false, Ordering::SeqCst);

        match result {
            Ok(TickOutcome::Completed(report)) => {
                tracing::debug!(
                    tick = %report.tick_id,
                    items = report.items.len(),
                    "Scheduled scan finished"
                );
            }
            Ok(TickOutcome::AlreadyRunning) => {}
            // Logged by the engine; the next interval retries.
            Err(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineConfig;
    use crate::memory::InMemoryStore;
    use crate::registry::GroupRegistry;
    use crate::test_support::{action, FakeChain, FakeGroup, RecordingSink};

    fn scheduler(frequency: Duration) -> (Arc<Scheduler>, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let engine = Engine::new(
            Arc::new(FakeChain::new(100, 1)),
            Arc::new(InMemoryStore::new()),
            GroupRegistry::new(),
            EngineConfig::default(),
        )
        .with_progress(sink.clone());
        (Arc::new(Scheduler::new(Arc::new(engine), frequency)), sink)
    }

    /// Scheduler over one eligible action whose submission takes `delay`.
    fn slow_scheduler(
        frequency: Duration,
        delay: Duration,
    ) -> (Arc<Scheduler>, Arc<RecordingSink>, Arc<FakeGroup>) {
        let sink = Arc::new(RecordingSink::default());
        let group = FakeGroup::new("ctrl").arc();
        *group.submit_delay.lock().unwrap() = delay;
        let store = Arc::new(InMemoryStore::new());
        store.enqueue(action(10, "ctrl", &["v1"], "0xaa")).unwrap();
        let mut groups = GroupRegistry::new();
        groups.register(group.clone());
        let engine = Engine::new(
            Arc::new(FakeChain::new(100_000, 1).with_commission("v1", 1)),
            store,
            groups,
            EngineConfig {
                delay_blocks: 10,
                execution_cooldown: Duration::ZERO,
                ..EngineConfig::default()
            },
        )
        .with_progress(sink.clone());
        (
            Arc::new(Scheduler::new(Arc::new(engine), frequency)),
            sink,
            group,
        )
    }

    fn completed_batches(sink: &RecordingSink) -> usize {
        sink.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.is_batch_complete())
            .count()
    }

    #[tokio::test]
    async fn test_scheduler_shutdown() {
        let (scheduler, sink) = scheduler(Duration::from_secs(60));
        scheduler.shutdown();

        tokio::time::timeout(Duration::from_secs(2), scheduler.run())
            .await
            .expect("Scheduler should shut down within timeout");
        assert_eq!(completed_batches(&sink), 0);
    }

    #[tokio::test]
    async fn test_scheduler_runs_periodic_ticks() {
        let (scheduler, sink) = scheduler(Duration::from_millis(20));
        let handle = {
            let scheduler = Arc::clone(&scheduler);
            tokio::spawn(async move { scheduler.run().await })
        };

        tokio::time::sleep(Duration::from_millis(150)).await;
        scheduler.shutdown();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("Scheduler should shut down within timeout")
            .unwrap();

        assert!(completed_batches(&sink) >= 2);
    }

    #[tokio::test]
    async fn test_manual_trigger_runs_extra_scan() {
        let (scheduler, sink) = scheduler(Duration::from_secs(3600));
        let handle = {
            let scheduler = Arc::clone(&scheduler);
            tokio::spawn(async move { scheduler.run().await })
        };

        // First interval tick fires immediately.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(completed_batches(&sink), 1);

        scheduler.trigger();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(completed_batches(&sink), 2);

        scheduler.shutdown();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("Scheduler should shut down within timeout")
            .unwrap();
    }

    #[tokio::test]
    async fn test_trigger_during_scan_is_dropped() {
        let (scheduler, sink, group) =
            slow_scheduler(Duration::from_secs(3600), Duration::from_millis(300));
        let handle = {
            let scheduler = Arc::clone(&scheduler);
            tokio::spawn(async move { scheduler.run().await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        scheduler.trigger();
        tokio::time::sleep(Duration::from_millis(800)).await;

        assert_eq!(completed_batches(&sink), 1);
        assert_eq!(group.submission_count(), 1);

        scheduler.shutdown();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("Scheduler should shut down within timeout")
            .unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_lets_running_scan_finish() {
        let (scheduler, sink, group) =
            slow_scheduler(Duration::from_secs(3600), Duration::from_millis(300));
        let handle = {
            let scheduler = Arc::clone(&scheduler);
            tokio::spawn(async move { scheduler.run().await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        scheduler.shutdown();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("Scheduler should shut down within timeout")
            .unwrap();

        assert_eq!(group.submission_count(), 1);
        assert_eq!(completed_batches(&sink), 1);
    }
}
