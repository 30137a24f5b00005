//! Per-tick action state machine with validated transitions.
//!
//! Pending -> Invalid -> Cancelling -> Cancelled
//! Pending -> ValidWaiting
//! Pending -> ValidEligible -> Executing -> Executed/ExecFailed

use keeper_core::types::BlockNumber;

use crate::error::ActionError;
use crate::types::{ActionState, Decision};

/// Validate that a state transition is allowed.
pub fn validate_transition(from: ActionState, to: ActionState) -> Result<(), ActionError> {
    let valid = matches!(
        (from, to),
        (ActionState::Pending, ActionState::Invalid)
            | (ActionState::Pending, ActionState::ValidWaiting)
            | (ActionState::Pending, ActionState::ValidEligible)
            | (ActionState::Invalid, ActionState::Cancelling)
            | (ActionState::Cancelling, ActionState::Cancelled)
            | (ActionState::ValidEligible, ActionState::Executing)
            | (ActionState::Executing, ActionState::Executed)
            | (ActionState::Executing, ActionState::ExecFailed)
    );

    if valid {
        Ok(())
    } else {
        Err(ActionError::InvalidTransition(from, to))
    }
}

/// Choose what to do with an action this tick.
///
/// Validity is checked before eligibility, so an action that went bad after
/// its delay passed is still cancelled rather than executed.
pub fn classify(
    all_valid: bool,
    announced_block: BlockNumber,
    delay_blocks: BlockNumber,
    current_block: BlockNumber,
) -> Decision {
    if !all_valid {
        return Decision::Cancel;
    }
    let ready_at = announced_block.saturating_add(delay_blocks);
    if ready_at > current_block {
        Decision::Wait { ready_at }
    } else {
        Decision::Execute
    }
}
