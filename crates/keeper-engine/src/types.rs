//! Value types produced by the engine while resolving a tick.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use keeper_core::types::{ActionKey, Address, BlockHash, BlockNumber, Commission, EraIndex};

// =============================================================================
// Enums
// =============================================================================

/// Lifecycle of one queued action within a single tick.
///
/// Every action starts at `Pending` on every tick. Nothing here is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionState {
    Pending,
    Invalid,
    ValidWaiting,
    ValidEligible,
    Cancelling,
    Cancelled,
    Executing,
    Executed,
    ExecFailed,
}

impl fmt::Display for ActionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionState::Pending => write!(f, "pending"),
            ActionState::Invalid => write!(f, "invalid"),
            ActionState::ValidWaiting => write!(f, "valid_waiting"),
            ActionState::ValidEligible => write!(f, "valid_eligible"),
            ActionState::Cancelling => write!(f, "cancelling"),
            ActionState::Cancelled => write!(f, "cancelled"),
            ActionState::Executing => write!(f, "executing"),
            ActionState::Executed => write!(f, "executed"),
            ActionState::ExecFailed => write!(f, "exec_failed"),
        }
    }
}

/// What the decision step chose for an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// At least one target is invalid: cancel matching announcements.
    Cancel,
    /// All targets valid, delay window still open.
    Wait { ready_at: BlockNumber },
    /// All targets valid and the delay window has passed.
    Execute,
}

impl Decision {
    /// State the action moves to out of `Pending`.
    pub fn state(&self) -> ActionState {
        match self {
            Decision::Cancel => ActionState::Invalid,
            Decision::Wait { .. } => ActionState::ValidWaiting,
            Decision::Execute => ActionState::ValidEligible,
        }
    }
}

/// Why an action was left untouched this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No principal group is registered for the action's controller.
    GroupNotFound,
    /// The action's principal is not the one registered for its controller.
    PrincipalMismatch,
    /// The action names no targets.
    NoTargets,
    /// The controller already executed a nomination earlier in this tick.
    AlreadyExecutedThisTick,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::GroupNotFound => write!(f, "no principal group for controller"),
            SkipReason::PrincipalMismatch => {
                write!(f, "principal differs from the controller's group")
            }
            SkipReason::NoTargets => write!(f, "action has no targets"),
            SkipReason::AlreadyExecutedThisTick => {
                write!(f, "controller already executed this tick")
            }
        }
    }
}

// =============================================================================
// Results
// =============================================================================

/// Commission check for one target.
///
/// `commission` is `None` when the lookup failed; such a target is never
/// valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidityResult {
    pub target: Address,
    pub commission: Option<Commission>,
    pub valid: bool,
}

impl ValidityResult {
    pub fn is_indeterminate(&self) -> bool {
        self.commission.is_none()
    }
}

/// Counts from cancelling the announcements that match one action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelReport {
    pub matched: usize,
    pub cancelled: usize,
    pub failed: usize,
}

/// What the executor did for one eligible action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub submitted: bool,
    pub finalized_block_hash: Option<BlockHash>,
    /// Whether the action was removed from the queue afterwards.
    pub deleted: bool,
    /// Human-readable summary naming every target.
    pub summary: String,
}

/// Final result for one action in a tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ItemOutcome {
    Skipped {
        reason: SkipReason,
    },
    Cancelled {
        invalid_targets: Vec<Address>,
        matched: usize,
        cancelled: usize,
    },
    CancelFailed {
        reason: String,
    },
    Waiting {
        ready_at: BlockNumber,
    },
    Executed {
        finalized_block_hash: Option<BlockHash>,
        deleted: bool,
    },
    ExecutionFailed {
        reason: String,
    },
}

impl ItemOutcome {
    /// Short note used for progress events.
    pub fn note(&self, key: &ActionKey) -> String {
        match self {
            ItemOutcome::Skipped { reason } => format!("skipped {}: {}", key, reason),
            ItemOutcome::Cancelled {
                matched, cancelled, ..
            } => format!("cancelled {} ({}/{} announcements)", key, cancelled, matched),
            ItemOutcome::CancelFailed { .. } => format!("cancel failed for {}", key),
            ItemOutcome::Waiting { ready_at } => {
                format!("{} waiting until block {}", key, ready_at)
            }
            ItemOutcome::Executed { .. } => format!("executed {}", key),
            ItemOutcome::ExecutionFailed { .. } => format!("execution failed for {}", key),
        }
    }
}

/// Outcome of one action, keyed by its queue identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemReport {
    pub key: ActionKey,
    pub outcome: ItemOutcome,
}

/// Everything a completed tick did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    pub tick_id: Uuid,
    pub current_block: BlockNumber,
    pub era: EraIndex,
    pub items: Vec<ItemReport>,
}

impl TickReport {
    fn count(&self, pred: impl Fn(&ItemOutcome) -> bool) -> usize {
        self.items.iter().filter(|i| pred(&i.outcome)).count()
    }

    pub fn executed(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Executed { .. }))
    }

    pub fn cancelled(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Cancelled { .. }))
    }

    pub fn waiting(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Waiting { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| {
            matches!(
                o,
                ItemOutcome::ExecutionFailed { .. } | ItemOutcome::CancelFailed { .. }
            )
        })
    }

    pub fn outcome_for(&self, key: &ActionKey) -> Option<&ItemOutcome> {
        self.items.iter().find(|i| &i.key == key).map(|i| &i.outcome)
    }
}

/// Result of asking the engine to run a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Completed(TickReport),
    /// Another tick held the lock; this trigger was dropped.
    AlreadyRunning,
}

/// Side-effect-free classification of a queued action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedAction {
    pub key: ActionKey,
    pub targets: Vec<Address>,
    pub validity: Vec<ValidityResult>,
    pub verdict: PlanVerdict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanVerdict {
    Skip(SkipReason),
    Decided(Decision),
}
