//! Tick driver: classifies every queued action and acts on it.
//!
//! One tick snapshots the latest block, the active era and the queue, then
//! resolves each action in queue order: validity check, classification,
//! then cancel, wait or execute. Item failures are contained in the item's
//! outcome; only a missing block, era or queue aborts the tick.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use uuid::Uuid;

use keeper_core::config::{
    KeeperConfig, DEFAULT_COMMISSION_THRESHOLD_PERCENT, DEFAULT_DELAY_BLOCKS,
    DEFAULT_EXECUTION_COOLDOWN_MS, DEFAULT_FINALIZATION_TIMEOUT_SECS,
};
use keeper_core::ports::{ActionStore, ChainClient, Notifier, PrincipalGroup, ProgressSink};
use keeper_core::types::{Address, BlockNumber, Commission, DelayedAction, EraIndex};

use crate::announcements::cancel_matching;
use crate::decision::{classify, ItemTracker};
use crate::error::{ActionError, EngineError};
use crate::executor::Executor;
use crate::notifier::NoopNotifier;
use crate::pacer::ExecutionPacer;
use crate::progress::{NoopProgressSink, ProgressReporter, EXECUTION_TASK};
use crate::registry::GroupRegistry;
use crate::types::{
    ActionState, Decision, ItemOutcome, ItemReport, PlanVerdict, PlannedAction, SkipReason,
    TickOutcome, TickReport, ValidityResult,
};
use crate::validity::{all_valid, check_targets, invalid_targets};

/// Tunables for the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub delay_blocks: BlockNumber,
    pub commission_threshold: Commission,
    pub execution_cooldown: Duration,
    pub finalization_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            delay_blocks: DEFAULT_DELAY_BLOCKS,
            commission_threshold: Commission::from_percent_f64(
                DEFAULT_COMMISSION_THRESHOLD_PERCENT,
            ),
            execution_cooldown: Duration::from_millis(DEFAULT_EXECUTION_COOLDOWN_MS),
            finalization_timeout: Duration::from_secs(DEFAULT_FINALIZATION_TIMEOUT_SECS),
        }
    }
}

impl EngineConfig {
    pub fn from_config(config: &KeeperConfig) -> Self {
        Self {
            delay_blocks: config.scan.delay_blocks,
            commission_threshold: config.validity.commission_threshold(),
            execution_cooldown: config.scan.execution_cooldown(),
            finalization_timeout: config.scan.finalization_timeout(),
        }
    }
}

/// The delayed-action decision and execution engine.
pub struct Engine {
    chain: Arc<dyn ChainClient>,
    store: Arc<dyn ActionStore>,
    groups: GroupRegistry,
    config: EngineConfig,
    executor: Executor,
    pacer: ExecutionPacer,
    progress: Arc<dyn ProgressSink>,
    notifier: Arc<dyn Notifier>,
    tick_lock: Mutex<()>,
}

impl Engine {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        store: Arc<dyn ActionStore>,
        groups: GroupRegistry,
        config: EngineConfig,
    ) -> Self {
        let executor = Executor::new(
            Arc::clone(&chain),
            Arc::clone(&store),
            config.finalization_timeout,
        );
        let pacer = ExecutionPacer::new(config.execution_cooldown);
        Self {
            chain,
            store,
            groups,
            config,
            executor,
            pacer,
            progress: Arc::new(NoopProgressSink),
            notifier: Arc::new(NoopNotifier),
            tick_lock: Mutex::new(()),
        }
    }

    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = sink;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn groups(&self) -> &GroupRegistry {
        &self.groups
    }

    /// Run one scan over the queue.
    ///
    /// Returns `TickOutcome::AlreadyRunning` without doing anything if another
    /// tick holds the lock.
    pub async fn run_tick(&self) -> Result<TickOutcome, EngineError> {
        let Ok(_guard) = self.tick_lock.try_lock() else {
            tracing::info!("Tick already running, dropping trigger");
            return Ok(TickOutcome::AlreadyRunning);
        };

        match self.tick().await {
            Ok(report) => {
                tracing::info!(
                    tick = %report.tick_id,
                    block = report.current_block,
                    era = report.era,
                    total = report.items.len(),
                    executed = report.executed(),
                    cancelled = report.cancelled(),
                    waiting = report.waiting(),
                    skipped = report.skipped(),
                    failed = report.failed(),
                    "Tick complete"
                );
                Ok(TickOutcome::Completed(report))
            }
            Err(e) => {
                tracing::error!(error = %e, "Tick aborted");
                Err(e)
            }
        }
    }

    async fn tick(&self) -> Result<TickReport, EngineError> {
        let tick_id = Uuid::new_v4();
        let current_block = self
            .chain
            .latest_block()
            .await
            .map_err(EngineError::BlockUnavailable)?;
        let era = self
            .chain
            .current_era()
            .await
            .map_err(EngineError::EraUnavailable)?;
        let actions = self
            .store
            .pending_actions()
            .map_err(EngineError::QueueUnavailable)?;

        tracing::debug!(
            tick = %tick_id,
            block = current_block,
            era,
            queued = actions.len(),
            "Tick started"
        );

        let reporter = ProgressReporter::new(
            Arc::clone(&self.progress),
            EXECUTION_TASK,
            tick_id,
            actions.len(),
        );
        let mut executed_controllers = HashSet::new();
        let mut items = Vec::with_capacity(actions.len());

        for (index, action) in actions.iter().enumerate() {
            let key = action.key();
            let outcome = self
                .process(action, current_block, era, &mut executed_controllers)
                .await;
            reporter.item_done(index, outcome.note(&key));
            items.push(ItemReport { key, outcome });
        }
        reporter.batch_complete();

        Ok(TickReport {
            tick_id,
            current_block,
            era,
            items,
        })
    }

    async fn process(
        &self,
        action: &DelayedAction,
        current_block: BlockNumber,
        era: EraIndex,
        executed_controllers: &mut HashSet<Address>,
    ) -> ItemOutcome {
        let key = action.key();
        match self
            .resolve(action, current_block, era, executed_controllers)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(key = %key, error = %e, "Action resolution failed");
                ItemOutcome::ExecutionFailed {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn resolve(
        &self,
        action: &DelayedAction,
        current_block: BlockNumber,
        era: EraIndex,
        executed_controllers: &mut HashSet<Address>,
    ) -> Result<ItemOutcome, ActionError> {
        let key = action.key();

        let group = match self.admit(action) {
            Ok(group) => group,
            Err(reason) => {
                tracing::warn!(key = %key, reason = %reason, "Skipping queued action");
                return Ok(ItemOutcome::Skipped { reason });
            }
        };

        let validity =
            check_targets(self.chain.as_ref(), &action.targets, self.config.commission_threshold)
                .await;
        let decision = classify(
            all_valid(&validity),
            action.announced_block,
            self.config.delay_blocks,
            current_block,
        );

        let mut tracker = ItemTracker::new(key.clone());
        tracker.advance(decision.state())?;

        match decision {
            Decision::Cancel => {
                self.cancel(&mut tracker, action, group.as_ref(), &validity)
                    .await
            }
            Decision::Wait { ready_at } => {
                tracing::debug!(
                    key = %key,
                    ready_at,
                    remaining = ready_at.saturating_sub(current_block),
                    "Nomination valid, delay not yet passed"
                );
                Ok(ItemOutcome::Waiting { ready_at })
            }
            Decision::Execute => {
                if executed_controllers.contains(&action.controller) {
                    tracing::warn!(
                        key = %key,
                        era,
                        "Controller already executed a nomination this tick"
                    );
                    return Ok(ItemOutcome::Skipped {
                        reason: SkipReason::AlreadyExecutedThisTick,
                    });
                }
                self.execute(&mut tracker, action, group.as_ref(), era, executed_controllers)
                    .await
            }
        }
    }

    /// Fatal-to-item checks shared by ticks and plans.
    fn admit(&self, action: &DelayedAction) -> Result<Arc<dyn PrincipalGroup>, SkipReason> {
        let group = self
            .groups
            .get(&action.controller)
            .ok_or(SkipReason::GroupNotFound)?;
        if group.principal() != &action.principal {
            return Err(SkipReason::PrincipalMismatch);
        }
        if action.targets.is_empty() {
            return Err(SkipReason::NoTargets);
        }
        Ok(group)
    }

    async fn cancel(
        &self,
        tracker: &mut ItemTracker,
        action: &DelayedAction,
        group: &dyn PrincipalGroup,
        validity: &[ValidityResult],
    ) -> Result<ItemOutcome, ActionError> {
        tracker.advance(ActionState::Cancelling)?;
        let invalid = invalid_targets(validity);
        tracing::info!(
            key = %tracker.key(),
            invalid = invalid.len(),
            "Cancelling nomination with invalid targets"
        );

        let report = match cancel_matching(group, &action.action_hash).await {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!(key = %tracker.key(), error = %e, "Could not list announcements");
                return Ok(ItemOutcome::CancelFailed {
                    reason: e.to_string(),
                });
            }
        };
        tracker.advance(ActionState::Cancelled)?;

        if report.cancelled > 0 {
            let message = self.cancel_message(action, validity);
            self.notifier.notify(&message).await;
        }

        Ok(ItemOutcome::Cancelled {
            invalid_targets: invalid,
            matched: report.matched,
            cancelled: report.cancelled,
        })
    }

    fn cancel_message(&self, action: &DelayedAction, validity: &[ValidityResult]) -> String {
        let reasons: Vec<String> = validity
            .iter()
            .filter(|r| !r.valid)
            .map(|r| match r.commission {
                Some(commission) => format!(
                    "{} commission {} above {}",
                    r.target, commission, self.config.commission_threshold
                ),
                None => format!("{} commission unknown", r.target),
            })
            .collect();
        format!(
            "Cancelled announced nomination for {} (block {}): {}",
            action.controller,
            action.announced_block,
            reasons.join(", ")
        )
    }

    async fn execute(
        &self,
        tracker: &mut ItemTracker,
        action: &DelayedAction,
        group: &dyn PrincipalGroup,
        era: EraIndex,
        executed_controllers: &mut HashSet<Address>,
    ) -> Result<ItemOutcome, ActionError> {
        tracker.advance(ActionState::Executing)?;
        self.pacer.wait_turn().await;

        match self.executor.execute(action, group, era).await {
            Ok(outcome) if outcome.submitted => {
                self.pacer.mark();
                executed_controllers.insert(action.controller.clone());
                tracker.advance(ActionState::Executed)?;
                self.notifier.notify(&outcome.summary).await;
                Ok(ItemOutcome::Executed {
                    finalized_block_hash: outcome.finalized_block_hash,
                    deleted: outcome.deleted,
                })
            }
            Ok(outcome) => {
                tracker.advance(ActionState::ExecFailed)?;
                Ok(ItemOutcome::ExecutionFailed {
                    reason: outcome.summary,
                })
            }
            Err(e) => {
                if e.may_have_submitted() {
                    self.pacer.mark();
                    executed_controllers.insert(action.controller.clone());
                }
                tracker.advance(ActionState::ExecFailed)?;
                tracing::warn!(key = %tracker.key(), error = %e, "Execution failed");
                self.notifier
                    .notify(&format!("Execution failed for {}: {}", tracker.key(), e))
                    .await;
                Ok(ItemOutcome::ExecutionFailed {
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Classify every queued action without cancelling or executing.
    pub async fn plan(&self) -> Result<Vec<PlannedAction>, EngineError> {
        let current_block = self
            .chain
            .latest_block()
            .await
            .map_err(EngineError::BlockUnavailable)?;
        let actions = self
            .store
            .pending_actions()
            .map_err(EngineError::QueueUnavailable)?;

        let mut eligible_controllers = HashSet::new();
        let mut planned = Vec::with_capacity(actions.len());
        for action in &actions {
            let (validity, verdict) = if let Err(reason) = self.admit(action) {
                (Vec::new(), PlanVerdict::Skip(reason))
            } else {
                let validity = check_targets(
                    self.chain.as_ref(),
                    &action.targets,
                    self.config.commission_threshold,
                )
                .await;
                let decision = classify(
                    all_valid(&validity),
                    action.announced_block,
                    self.config.delay_blocks,
                    current_block,
                );
                let verdict = match decision {
                    Decision::Execute if !eligible_controllers.insert(action.controller.clone()) => {
                        PlanVerdict::Skip(SkipReason::AlreadyExecutedThisTick)
                    }
                    decision => PlanVerdict::Decided(decision),
                };
                (validity, verdict)
            };
            planned.push(PlannedAction {
                key: action.key(),
                targets: action.targets.clone(),
                validity,
                verdict,
            });
        }
        Ok(planned)
    }
}
