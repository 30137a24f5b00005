//! Submission of eligible nominations.
//!
//! The executor submits through the principal group, waits for
//! finalization, writes the audit record and only then removes the action
//! from the queue. A crash between the two writes leaves a duplicate record
//! and a queued action, never a lost execution.

use std::sync::Arc;
use std::time::Duration;

use keeper_core::ports::{ActionStore, ChainClient, PrincipalGroup};
use keeper_core::types::{Address, DelayedAction, EraIndex, ExecutionRecord, Timestamp};

use crate::error::ActionError;
use crate::types::ExecutionOutcome;

/// Placeholder for a target whose display name cannot be resolved.
pub const UNKNOWN_NAME: &str = "<unknown>";

pub struct Executor {
    chain: Arc<dyn ChainClient>,
    store: Arc<dyn ActionStore>,
    finalization_timeout: Duration,
}

impl Executor {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        store: Arc<dyn ActionStore>,
        finalization_timeout: Duration,
    ) -> Self {
        Self {
            chain,
            store,
            finalization_timeout,
        }
    }

    /// Execute one eligible action for `group` in `era`.
    ///
    /// Errors leave the action queued. `ActionError::Unrecorded` means the
    /// nomination reached the chain but no record was written.
    pub async fn execute(
        &self,
        action: &DelayedAction,
        group: &dyn PrincipalGroup,
        era: EraIndex,
    ) -> Result<ExecutionOutcome, ActionError> {
        let key = action.key();
        let bonded = self.chain.bonded_amount(group.principal()).await?;

        tracing::info!(
            key = %key,
            era,
            targets = action.targets.len(),
            "Submitting nomination"
        );

        let submit = group.submit_nomination(&action.targets);
        let submission = match tokio::time::timeout(self.finalization_timeout, submit).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!(
                    key = %key,
                    timeout_secs = self.finalization_timeout.as_secs(),
                    "Nomination not finalized in time"
                );
                return Err(ActionError::Timeout(self.finalization_timeout.as_secs()));
            }
        };

        if !submission.submitted {
            tracing::info!(key = %key, "Nomination was not submitted, leaving action queued");
            return Ok(ExecutionOutcome {
                submitted: false,
                finalized_block_hash: None,
                deleted: false,
                summary: format!("Nomination for {} was not submitted", action.controller),
            });
        }

        let record = ExecutionRecord {
            controller: action.controller.clone(),
            era,
            targets: action.targets.clone(),
            bonded,
            finalized_block_hash: submission.finalized_block_hash.clone(),
            executed_at: Timestamp::now(),
        };
        if let Err(e) = self.store.record_execution(&record) {
            tracing::error!(key = %key, error = %e, "Nomination submitted but not recorded");
            return Err(ActionError::Unrecorded(e));
        }

        let deleted = match self.store.delete_action(&key) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    key = %key,
                    error = %e,
                    "Executed action could not be removed from the queue"
                );
                false
            }
        };

        let summary = self.summary(action, era);
        tracing::info!(
            key = %key,
            era,
            block_hash = submission
                .finalized_block_hash
                .as_ref()
                .map(|h| h.to_string())
                .unwrap_or_default(),
            deleted,
            "Nomination executed"
        );

        Ok(ExecutionOutcome {
            submitted: true,
            finalized_block_hash: submission.finalized_block_hash,
            deleted,
            summary,
        })
    }

    fn summary(&self, action: &DelayedAction, era: EraIndex) -> String {
        let names: Vec<String> = action
            .targets
            .iter()
            .map(|t| format!("{} ({})", self.display_name(t), t))
            .collect();
        format!(
            "Executed nomination for {} in era {}: {}",
            action.controller,
            era,
            names.join(", ")
        )
    }

    fn display_name(&self, target: &Address) -> String {
        match self.store.candidate_name(target) {
            Ok(Some(name)) => name,
            Ok(None) => UNKNOWN_NAME.to_string(),
            Err(e) => {
                tracing::debug!(validator = %target, error = %e, "Candidate name lookup failed");
                UNKNOWN_NAME.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{action, addr, FakeChain, FakeGroup, FlakyStore};
    use keeper_core::error::LedgerError;
    use keeper_core::types::{BlockHash, Submission};
    use std::sync::atomic::Ordering;

    struct Fixture {
        chain: Arc<FakeChain>,
        store: Arc<FlakyStore>,
        executor: Executor,
    }

    fn fixture() -> Fixture {
        let chain = Arc::new(FakeChain::new(10_000, 42));
        let store = FlakyStore::default().arc();
        let executor = Executor::new(chain.clone(), store.clone(), Duration::from_secs(5));
        Fixture {
            chain,
            store,
            executor,
        }
    }

    #[tokio::test]
    async fn test_success_records_then_deletes() {
        let f = fixture();
        let a = action(8700, "ctrl", &["v1", "v2"], "0xaa");
        f.store.inner.enqueue(a.clone()).unwrap();
        f.store.inner.set_candidate_name(addr("v1"), "One");
        let group = FakeGroup::new("ctrl");

        let outcome = f.executor.execute(&a, &group, 42).await.unwrap();

        assert!(outcome.submitted);
        assert!(outcome.deleted);
        assert_eq!(outcome.finalized_block_hash, Some(BlockHash("0xfinal".into())));
        assert!(!f.store.inner.contains(&a.key()));
        assert_eq!(group.submissions.lock().unwrap()[0], vec![addr("v1"), addr("v2")]);

        let records = f.store.inner.executions();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].controller, addr("ctrl"));
        assert_eq!(records[0].era, 42);
        assert_eq!(records[0].targets, a.targets);
        assert_eq!(records[0].bonded, 1_000);

        assert_eq!(
            outcome.summary,
            "Executed nomination for ctrl in era 42: One (v1), <unknown> (v2)"
        );
    }

    #[tokio::test]
    async fn test_not_submitted_keeps_action() {
        let f = fixture();
        let a = action(8700, "ctrl", &["v1"], "0xaa");
        f.store.inner.enqueue(a.clone()).unwrap();
        let group = FakeGroup::new("ctrl");
        *group.submit_result.lock().unwrap() = Ok(Submission::not_submitted());

        let outcome = f.executor.execute(&a, &group, 42).await.unwrap();

        assert!(!outcome.submitted);
        assert!(!outcome.deleted);
        assert!(f.store.inner.contains(&a.key()));
        assert!(f.store.inner.executions().is_empty());
    }

    #[tokio::test]
    async fn test_bonded_failure_skips_submission() {
        let f = fixture();
        *f.chain.bonded.lock().unwrap() = Err(LedgerError::Unavailable);
        let a = action(8700, "ctrl", &["v1"], "0xaa");
        let group = FakeGroup::new("ctrl");

        let err = f.executor.execute(&a, &group, 42).await.unwrap_err();

        assert!(matches!(err, ActionError::Ledger(LedgerError::Unavailable)));
        assert_eq!(group.submission_count(), 0);
    }

    #[tokio::test]
    async fn test_submission_error_is_ledger_error() {
        let f = fixture();
        let a = action(8700, "ctrl", &["v1"], "0xaa");
        f.store.inner.enqueue(a.clone()).unwrap();
        let group = FakeGroup::new("ctrl");
        *group.submit_result.lock().unwrap() = Err(LedgerError::Rejected("bad origin".into()));

        let err = f.executor.execute(&a, &group, 42).await.unwrap_err();

        assert!(matches!(err, ActionError::Ledger(_)));
        assert!(!err.may_have_submitted());
        assert!(f.store.inner.contains(&a.key()));
        assert!(f.store.inner.executions().is_empty());
    }

    #[tokio::test]
    async fn test_finalization_timeout() {
        let chain = Arc::new(FakeChain::new(10_000, 42));
        let store = FlakyStore::default().arc();
        let executor = Executor::new(chain, store.clone(), Duration::from_millis(20));
        let a = action(8700, "ctrl", &["v1"], "0xaa");
        store.inner.enqueue(a.clone()).unwrap();
        let group = FakeGroup::new("ctrl");
        *group.submit_delay.lock().unwrap() = Duration::from_secs(5);

        let err = executor.execute(&a, &group, 42).await.unwrap_err();

        assert!(matches!(err, ActionError::Timeout(_)));
        assert!(store.inner.contains(&a.key()));
        assert!(store.inner.executions().is_empty());
    }

    #[tokio::test]
    async fn test_record_failure_does_not_delete() {
        let f = fixture();
        let a = action(8700, "ctrl", &["v1"], "0xaa");
        f.store.inner.enqueue(a.clone()).unwrap();
        f.store.fail_record.store(true, Ordering::SeqCst);
        let group = FakeGroup::new("ctrl");

        let err = f.executor.execute(&a, &group, 42).await.unwrap_err();

        assert!(matches!(err, ActionError::Unrecorded(_)));
        assert!(err.may_have_submitted());
        assert!(f.store.inner.contains(&a.key()));
    }

    #[tokio::test]
    async fn test_delete_failure_still_succeeds() {
        let f = fixture();
        let a = action(8700, "ctrl", &["v1"], "0xaa");
        f.store.inner.enqueue(a.clone()).unwrap();
        f.store.fail_delete.store(true, Ordering::SeqCst);
        let group = FakeGroup::new("ctrl");

        let outcome = f.executor.execute(&a, &group, 42).await.unwrap();

        assert!(outcome.submitted);
        assert!(!outcome.deleted);
        assert_eq!(f.store.inner.executions().len(), 1);
        assert!(f.store.inner.contains(&a.key()));
    }

    #[tokio::test]
    async fn test_name_lookup_failure_uses_placeholder() {
        let f = fixture();
        let a = action(8700, "ctrl", &["v1"], "0xaa");
        f.store.inner.set_candidate_name(addr("v1"), "One");
        f.store.fail_names.store(true, Ordering::SeqCst);
        let group = FakeGroup::new("ctrl");

        let outcome = f.executor.execute(&a, &group, 7).await.unwrap();

        assert_eq!(
            outcome.summary,
            "Executed nomination for ctrl in era 7: <unknown> (v1)"
        );
    }
}
