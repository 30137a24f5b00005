//! Ledger backed by a JSON snapshot file.
//!
//! The snapshot is re-read at the start of every tick, so an operator (or a
//! sync job) can refresh it while `keeper run` is active. Nothing is ever
//! sent: cancellations are logged and submissions report `submitted = false`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use keeper_core::config::GroupConfig;
use keeper_core::error::{KeeperError, LedgerError};
use keeper_core::ports::{ChainClient, PrincipalGroup};
use keeper_core::types::{
    Address, Announcement, Balance, BlockNumber, Commission, EraIndex, Submission,
};

/// On-disk layout of the ledger snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerSnapshot {
    pub block: BlockNumber,
    pub era: EraIndex,
    /// Bonded balance per stash.
    pub bonded: HashMap<Address, Balance>,
    /// Declared commission per validator, in percent.
    pub commissions: HashMap<Address, f64>,
    /// Outstanding proxy announcements per controller.
    pub announcements: HashMap<Address, Vec<Announcement>>,
}

impl LedgerSnapshot {
    pub fn load(path: &Path) -> Result<Self, KeeperError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Non-blocking variant of [`load`](Self::load) for use on the runtime.
    pub async fn reload(path: &Path) -> Result<Self, KeeperError> {
        let content = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Read-only [`ChainClient`] over a snapshot file.
pub struct SnapshotLedger {
    path: PathBuf,
    snapshot: RwLock<LedgerSnapshot>,
}

impl SnapshotLedger {
    pub fn open(path: &Path) -> Result<Self, KeeperError> {
        let snapshot = LedgerSnapshot::load(path)?;
        tracing::info!(
            path = %path.display(),
            block = snapshot.block,
            era = snapshot.era,
            "Ledger snapshot loaded"
        );
        Ok(Self {
            path: path.to_path_buf(),
            snapshot: RwLock::new(snapshot),
        })
    }

    /// Re-read the snapshot file. A failed read keeps the previous snapshot.
    pub async fn refresh(&self) {
        match LedgerSnapshot::reload(&self.path).await {
            Ok(snapshot) => {
                if let Ok(mut current) = self.snapshot.write() {
                    *current = snapshot;
                }
            }
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to refresh ledger snapshot, keeping previous state"
                );
            }
        }
    }

    fn read<T>(&self, f: impl FnOnce(&LedgerSnapshot) -> T) -> Result<T, LedgerError> {
        self.snapshot
            .read()
            .map(|snapshot| f(&*snapshot))
            .map_err(|_| LedgerError::Unavailable)
    }

    /// Dry-run principal group for a configured controller.
    pub fn group(self: &Arc<Self>, config: &GroupConfig) -> DryRunGroup {
        DryRunGroup {
            controller: config.controller.clone(),
            principal: config.principal.clone(),
            ledger: Arc::clone(self),
        }
    }
}

#[async_trait]
impl ChainClient for SnapshotLedger {
    async fn latest_block(&self) -> Result<BlockNumber, LedgerError> {
        self.refresh().await;
        self.read(|s| s.block)
    }

    async fn current_era(&self) -> Result<EraIndex, LedgerError> {
        self.read(|s| s.era)
    }

    async fn bonded_amount(&self, stash: &Address) -> Result<Balance, LedgerError> {
        self.read(|s| s.bonded.get(stash).copied())?
            .ok_or_else(|| LedgerError::Query(format!("no bonded balance for {}", stash)))
    }

    async fn commission(&self, validator: &Address) -> Result<Commission, LedgerError> {
        self.read(|s| s.commissions.get(validator).copied())?
            .map(Commission::from_percent_f64)
            .ok_or_else(|| LedgerError::Query(format!("no commission for {}", validator)))
    }
}

/// Principal group that reads announcements from the snapshot and never
/// signs anything.
pub struct DryRunGroup {
    controller: Address,
    principal: Address,
    ledger: Arc<SnapshotLedger>,
}

#[async_trait]
impl PrincipalGroup for DryRunGroup {
    fn controller(&self) -> &Address {
        &self.controller
    }

    fn principal(&self) -> &Address {
        &self.principal
    }

    async fn announcements(&self) -> Result<Vec<Announcement>, LedgerError> {
        self.ledger.read(|s| {
            s.announcements
                .get(&self.controller)
                .cloned()
                .unwrap_or_default()
        })
    }

    async fn cancel(&self, announcement: &Announcement) -> Result<(), LedgerError> {
        tracing::info!(
            controller = %self.controller,
            real = %announcement.real,
            call_hash = %announcement.call_hash,
            "Dry run: would remove announcement"
        );
        Ok(())
    }

    async fn submit_nomination(&self, targets: &[Address]) -> Result<Submission, LedgerError> {
        let targets: Vec<&str> = targets.iter().map(|t| t.as_str()).collect();
        tracing::info!(
            controller = %self.controller,
            principal = %self.principal,
            targets = ?targets,
            "Dry run: would execute announced nomination"
        );
        Ok(Submission::not_submitted())
    }
}
