//! Decision engine: per-action classification and state tracking.

pub mod state_machine;

use keeper_core::types::ActionKey;

use crate::decision::state_machine::validate_transition;
use crate::error::ActionError;
use crate::types::ActionState;

pub use state_machine::classify;

/// Tracks one action through its states for the duration of a tick.
#[derive(Debug)]
pub struct ItemTracker {
    key: ActionKey,
    state: ActionState,
    history: Vec<ActionState>,
}

impl ItemTracker {
    pub fn new(key: ActionKey) -> Self {
        Self {
            key,
            state: ActionState::Pending,
            history: vec![ActionState::Pending],
        }
    }

    pub fn key(&self) -> &ActionKey {
        &self.key
    }

    pub fn state(&self) -> ActionState {
        self.state
    }

    /// States visited so far, starting with `Pending`.
    pub fn history(&self) -> &[ActionState] {
        &self.history
    }

    /// Move to `to`, rejecting transitions the state machine does not allow.
    pub fn advance(&mut self, to: ActionState) -> Result<(), ActionError> {
        validate_transition(self.state, to)?;
        tracing::trace!(key = %self.key, from = %self.state, to = %to, "Action state change");
        self.state = to;
        self.history.push(to);
        Ok(())
    }
}
