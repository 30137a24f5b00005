//! Error types for the execution engine.

use keeper_core::error::{KeeperError, LedgerError, StoreError};

use crate::types::ActionState;

/// Errors from resolving a single queued action. Never escape the item.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("Ledger call failed: {0}")]
    Ledger(#[from] LedgerError),
    #[error("Finalization timed out after {0} seconds")]
    Timeout(u64),
    #[error("Nomination submitted but the execution record was not written: {0}")]
    Unrecorded(StoreError),
    #[error("Invalid state transition: {0} -> {1}")]
    InvalidTransition(ActionState, ActionState),
}

impl ActionError {
    /// Whether the nomination may have reached the chain despite the error.
    pub fn may_have_submitted(&self) -> bool {
        matches!(self, ActionError::Timeout(_) | ActionError::Unrecorded(_))
    }
}

/// Errors that abort a whole tick.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Latest block unavailable: {0}")]
    BlockUnavailable(LedgerError),
    #[error("Current era unavailable: {0}")]
    EraUnavailable(LedgerError),
    #[error("Delayed-action queue unavailable: {0}")]
    QueueUnavailable(StoreError),
}

impl From<EngineError> for KeeperError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::BlockUnavailable(e) | EngineError::EraUnavailable(e) => e.into(),
            EngineError::QueueUnavailable(e) => e.into(),
        }
    }
}
