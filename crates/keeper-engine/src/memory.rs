//! In-memory `ActionStore`.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use keeper_core::error::StoreError;
use keeper_core::ports::ActionStore;
use keeper_core::types::{ActionKey, Address, DelayedAction, ExecutionRecord};

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StoreError> {
    mutex
        .lock()
        .map_err(|e| StoreError::Poisoned(e.to_string()))
}

/// Queue, execution log and candidate names held behind mutexes.
///
/// Ordering matches the SQLite store: announced block first, then
/// insertion order.
#[derive(Default)]
pub struct InMemoryStore {
    actions: Mutex<Vec<DelayedAction>>,
    executions: Mutex<Vec<ExecutionRecord>>,
    candidates: Mutex<HashMap<Address, String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an action. Rejects a second action with the same key.
    pub fn enqueue(&self, action: DelayedAction) -> Result<(), StoreError> {
        let mut actions = lock(&self.actions)?;
        let key = action.key();
        if actions.iter().any(|a| a.key() == key) {
            return Err(StoreError::Database(format!("duplicate action {}", key)));
        }
        let pos = actions
            .iter()
            .position(|a| a.announced_block > action.announced_block)
            .unwrap_or(actions.len());
        actions.insert(pos, action);
        Ok(())
    }

    pub fn set_candidate_name(&self, address: Address, name: impl Into<String>) {
        if let Ok(mut candidates) = lock(&self.candidates) {
            candidates.insert(address, name.into());
        }
    }

    pub fn executions(&self) -> Vec<ExecutionRecord> {
        lock(&self.executions)
            .map(|e| e.clone())
            .unwrap_or_default()
    }

    pub fn contains(&self, key: &ActionKey) -> bool {
        lock(&self.actions)
            .map(|a| a.iter().any(|a| &a.key() == key))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        lock(&self.actions).map(|a| a.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ActionStore for InMemoryStore {
    fn pending_actions(&self) -> Result<Vec<DelayedAction>, StoreError> {
        Ok(lock(&self.actions)?.clone())
    }

    fn record_execution(&self, record: &ExecutionRecord) -> Result<(), StoreError> {
        lock(&self.executions)?.push(record.clone());
        Ok(())
    }

    fn delete_action(&self, key: &ActionKey) -> Result<(), StoreError> {
        let mut actions = lock(&self.actions)?;
        let before = actions.len();
        actions.retain(|a| &a.key() != key);
        if actions.len() == before {
            tracing::debug!(key = %key, "Delete requested for action that is no longer queued");
        }
        Ok(())
    }

    fn candidate_name(&self, address: &Address) -> Result<Option<String>, StoreError> {
        Ok(lock(&self.candidates)?.get(address).cloned())
    }
}
