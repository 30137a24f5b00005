//! Collaborator contracts consumed by the execution engine.
//!
//! The engine never talks to a chain node, a database or a chat service
//! directly. Each of those is reached through one of the traits below and
//! every call returns an explicit `Result` the engine must inspect.

use async_trait::async_trait;

use crate::error::{LedgerError, StoreError};
use crate::events::ProgressEvent;
use crate::types::{
    ActionKey, Address, Announcement, Balance, BlockNumber, Commission, DelayedAction, EraIndex,
    ExecutionRecord, Submission,
};

/// Read access to ledger state.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Height of the latest known block.
    async fn latest_block(&self) -> Result<BlockNumber, LedgerError>;

    /// Index of the active staking era.
    async fn current_era(&self) -> Result<EraIndex, LedgerError>;

    /// Bonded balance of a stash account.
    async fn bonded_amount(&self, stash: &Address) -> Result<Balance, LedgerError>;

    /// Current commission declared by a validator.
    async fn commission(&self, validator: &Address) -> Result<Commission, LedgerError>;
}

/// A controller acting for a principal through a time-delay proxy.
///
/// Implementations own the signing key of the controller; the engine only
/// sees the operations.
#[async_trait]
pub trait PrincipalGroup: Send + Sync {
    fn controller(&self) -> &Address;

    fn principal(&self) -> &Address;

    /// Announcements the controller has outstanding with the proxy pallet.
    async fn announcements(&self) -> Result<Vec<Announcement>, LedgerError>;

    /// Remove a single announcement.
    async fn cancel(&self, announcement: &Announcement) -> Result<(), LedgerError>;

    /// Execute the announced nomination for `targets` and wait for
    /// finalization.
    async fn submit_nomination(&self, targets: &[Address]) -> Result<Submission, LedgerError>;
}

/// Persistence for the delayed-action queue and its audit trail.
pub trait ActionStore: Send + Sync {
    /// All queued actions, in processing order.
    fn pending_actions(&self) -> Result<Vec<DelayedAction>, StoreError>;

    fn record_execution(&self, record: &ExecutionRecord) -> Result<(), StoreError>;

    fn delete_action(&self, key: &ActionKey) -> Result<(), StoreError>;

    /// Human-readable name of a validator, if one is known.
    fn candidate_name(&self, address: &Address) -> Result<Option<String>, StoreError>;
}

/// Receiver of progress events. Delivery is fire-and-forget.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

/// Best-effort human-readable alerts.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str);
}
