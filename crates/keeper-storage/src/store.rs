use std::path::Path;
use std::sync::Arc;

use keeper_core::error::StoreError;
use keeper_core::ports::ActionStore;
use keeper_core::types::{ActionKey, Address, DelayedAction, ExecutionRecord};

use crate::db::Database;
use crate::repository::{CandidateRepository, DelayedActionRepository, ExecutionRepository};

/// SQLite-backed [`ActionStore`].
pub struct SqliteStore {
    pub actions: DelayedActionRepository,
    pub executions: ExecutionRepository,
    pub candidates: CandidateRepository,
}

impl SqliteStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            actions: DelayedActionRepository::new(Arc::clone(&db)),
            executions: ExecutionRepository::new(Arc::clone(&db)),
            candidates: CandidateRepository::new(db),
        }
    }

    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Ok(Self::new(Arc::new(Database::new(path)?)))
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        Ok(Self::new(Arc::new(Database::in_memory()?)))
    }

    pub fn enqueue(&self, action: &DelayedAction) -> Result<(), StoreError> {
        self.actions.insert(action)
    }
}

impl ActionStore for SqliteStore {
    fn pending_actions(&self) -> Result<Vec<DelayedAction>, StoreError> {
        self.actions.list()
    }

    fn record_execution(&self, record: &ExecutionRecord) -> Result<(), StoreError> {
        self.executions.save(record)
    }

    fn delete_action(&self, key: &ActionKey) -> Result<(), StoreError> {
        if !self.actions.delete(key)? {
            tracing::debug!(key = %key, "Delete requested for action that is no longer queued");
        }
        Ok(())
    }

    fn candidate_name(&self, address: &Address) -> Result<Option<String>, StoreError> {
        self.candidates.display_name(address)
    }
}
