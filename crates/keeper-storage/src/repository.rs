//! Repository implementations for SQLite-backed persistence.
//!
//! Provides DelayedActionRepository, ExecutionRepository and
//! CandidateRepository that operate on the Database struct using raw SQL.

use std::sync::Arc;

use rusqlite::OptionalExtension;

use keeper_core::error::StoreError;
use keeper_core::types::{
    ActionKey, Address, Balance, BlockHash, CallHash, DelayedAction, EraIndex, ExecutionRecord,
    Timestamp,
};

use crate::db::Database;

fn db_err(context: &str) -> impl Fn(rusqlite::Error) -> StoreError + '_ {
    move |e| StoreError::Database(format!("{}: {}", context, e))
}

fn encode_targets(targets: &[Address]) -> Result<String, StoreError> {
    serde_json::to_string(targets).map_err(|e| StoreError::Corrupt(e.to_string()))
}

fn decode_targets(raw: &str) -> Result<Vec<Address>, StoreError> {
    serde_json::from_str(raw)
        .map_err(|e| StoreError::Corrupt(format!("targets column {:?}: {}", raw, e)))
}

/// SQLite integers are signed; blocks past `i64::MAX` cannot be stored.
fn block_column(block: u64) -> Result<i64, StoreError> {
    i64::try_from(block)
        .map_err(|_| StoreError::Corrupt(format!("block {} out of storage range", block)))
}

/// Repository for the delayed-action queue.
pub struct DelayedActionRepository {
    db: Arc<Database>,
}

impl DelayedActionRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Queue a new action. Fails if the `(announced_block, controller)` key
    /// is already queued.
    pub fn insert(&self, action: &DelayedAction) -> Result<(), StoreError> {
        let block = block_column(action.announced_block)?;
        let targets = encode_targets(&action.targets)?;
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO delayed_actions (announced_block, controller, principal, targets, action_hash)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    block,
                    action.controller.as_str(),
                    action.principal.as_str(),
                    targets,
                    action.action_hash.as_str(),
                ],
            )
            .map_err(db_err("Failed to queue action"))?;
            Ok(())
        })
    }

    /// All queued actions, oldest announcement first.
    pub fn list(&self) -> Result<Vec<DelayedAction>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT announced_block, controller, principal, targets, action_hash
                     FROM delayed_actions
                     ORDER BY announced_block ASC, id ASC",
                )
                .map_err(db_err("Failed to prepare queue query"))?;

            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                })
                .map_err(db_err("Failed to read queue"))?;

            let mut actions = Vec::new();
            for row in rows {
                let (block, controller, principal, targets, hash) =
                    row.map_err(db_err("Failed to read queue row"))?;
                let block = u64::try_from(block).map_err(|_| {
                    StoreError::Corrupt(format!("negative announced block {}", block))
                })?;
                actions.push(DelayedAction {
                    announced_block: block,
                    principal: Address(principal),
                    controller: Address(controller),
                    targets: decode_targets(&targets)?,
                    action_hash: CallHash::new(hash),
                });
            }
            Ok(actions)
        })
    }

    /// Remove the action with the given key. Returns whether a row existed.
    pub fn delete(&self, key: &ActionKey) -> Result<bool, StoreError> {
        let Ok(block) = block_column(key.announced_block) else {
            return Ok(false);
        };
        self.db.with_conn(|conn| {
            let removed = conn
                .execute(
                    "DELETE FROM delayed_actions WHERE announced_block = ?1 AND controller = ?2",
                    rusqlite::params![block, key.controller.as_str()],
                )
                .map_err(db_err("Failed to delete action"))?;
            Ok(removed > 0)
        })
    }

    pub fn count(&self) -> Result<u64, StoreError> {
        self.db.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM delayed_actions", [], |row| row.get(0))
                .map_err(db_err("Failed to count queue"))?;
            Ok(count as u64)
        })
    }
}

/// Repository for executed-nomination records.
pub struct ExecutionRepository {
    db: Arc<Database>,
}

impl ExecutionRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn save(&self, record: &ExecutionRecord) -> Result<(), StoreError> {
        let targets = encode_targets(&record.targets)?;
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO executions (controller, era, targets, bonded, finalized_block_hash, executed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    record.controller.as_str(),
                    record.era,
                    targets,
                    record.bonded.to_string(),
                    record.finalized_block_hash.as_ref().map(|h| h.0.as_str()),
                    record.executed_at.0,
                ],
            )
            .map_err(db_err("Failed to save execution"))?;
            Ok(())
        })
    }

    /// Most recent executions first, optionally for one controller.
    pub fn list(
        &self,
        controller: Option<&Address>,
        limit: u64,
    ) -> Result<Vec<ExecutionRecord>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT controller, era, targets, bonded, finalized_block_hash, executed_at
                     FROM executions
                     WHERE (?1 IS NULL OR controller = ?1)
                     ORDER BY id DESC
                     LIMIT ?2",
                )
                .map_err(db_err("Failed to prepare history query"))?;

            let rows = stmt
                .query_map(
                    rusqlite::params![controller.map(|c| c.as_str()), limit as i64],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, u32>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, Option<String>>(4)?,
                            row.get::<_, i64>(5)?,
                        ))
                    },
                )
                .map_err(db_err("Failed to read history"))?;

            let mut records = Vec::new();
            for row in rows {
                let (controller, era, targets, bonded, hash, executed_at) =
                    row.map_err(db_err("Failed to read history row"))?;
                records.push(ExecutionRecord {
                    controller: Address(controller),
                    era: era as EraIndex,
                    targets: decode_targets(&targets)?,
                    bonded: bonded
                        .parse::<Balance>()
                        .map_err(|e| StoreError::Corrupt(format!("bonded {:?}: {}", bonded, e)))?,
                    finalized_block_hash: hash.map(BlockHash),
                    executed_at: Timestamp(executed_at),
                });
            }
            Ok(records)
        })
    }

    pub fn find(
        &self,
        controller: &Address,
        era: EraIndex,
    ) -> Result<Vec<ExecutionRecord>, StoreError> {
        Ok(self
            .list(Some(controller), u32::MAX as u64)?
            .into_iter()
            .filter(|r| r.era == era)
            .collect())
    }
}

/// Repository for validator display names.
pub struct CandidateRepository {
    db: Arc<Database>,
}

impl CandidateRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn upsert(&self, address: &Address, display_name: &str) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO candidates (address, display_name) VALUES (?1, ?2)
                 ON CONFLICT(address) DO UPDATE SET display_name = excluded.display_name",
                rusqlite::params![address.as_str(), display_name],
            )
            .map_err(db_err("Failed to save candidate"))?;
            Ok(())
        })
    }

    pub fn display_name(&self, address: &Address) -> Result<Option<String>, StoreError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT display_name FROM candidates WHERE address = ?1",
                rusqlite::params![address.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err("Failed to read candidate"))
        })
    }
}
