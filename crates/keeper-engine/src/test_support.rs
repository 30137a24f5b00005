//! Scripted ledger fakes shared by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use keeper_core::error::{LedgerError, StoreError};
use keeper_core::ports::{ActionStore, ChainClient, Notifier, PrincipalGroup, ProgressSink};
use keeper_core::types::{
    ActionKey, Address, Announcement, Balance, BlockHash, BlockNumber, CallHash, Commission,
    DelayedAction, EraIndex, ExecutionRecord, Submission,
};
use keeper_core::ProgressEvent;

use crate::memory::InMemoryStore;

pub fn addr(s: &str) -> Address {
    Address::from(s)
}

pub fn action(block: BlockNumber, controller: &str, targets: &[&str], hash: &str) -> DelayedAction {
    DelayedAction {
        announced_block: block,
        principal: Address::from(format!("stash-of-{}", controller).as_str()),
        controller: addr(controller),
        targets: targets.iter().map(|t| addr(t)).collect(),
        action_hash: CallHash::new(hash),
    }
}

pub fn announcement(hash: &str, real: &str) -> Announcement {
    Announcement {
        call_hash: CallHash::new(hash),
        real: addr(real),
        height: 0,
    }
}

/// Chain whose answers are set up front. Targets without a configured
/// commission fail their lookup.
pub struct FakeChain {
    pub block: Mutex<Result<BlockNumber, LedgerError>>,
    pub era: Mutex<Result<EraIndex, LedgerError>>,
    pub bonded: Mutex<Result<Balance, LedgerError>>,
    pub commissions: Mutex<HashMap<Address, Commission>>,
    pub commission_calls: AtomicUsize,
}

impl FakeChain {
    pub fn new(block: BlockNumber, era: EraIndex) -> Self {
        Self {
            block: Mutex::new(Ok(block)),
            era: Mutex::new(Ok(era)),
            bonded: Mutex::new(Ok(1_000)),
            commissions: Mutex::new(HashMap::new()),
            commission_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_commission(self, target: &str, percent: u32) -> Self {
        self.set_commission(target, percent);
        self
    }

    pub fn set_commission(&self, target: &str, percent: u32) {
        self.commissions
            .lock()
            .unwrap()
            .insert(addr(target), Commission::from_percent(percent));
    }
}

#[async_trait]
impl ChainClient for FakeChain {
    async fn latest_block(&self) -> Result<BlockNumber, LedgerError> {
        self.block.lock().unwrap().clone()
    }

    async fn current_era(&self) -> Result<EraIndex, LedgerError> {
        self.era.lock().unwrap().clone()
    }

    async fn bonded_amount(&self, _stash: &Address) -> Result<Balance, LedgerError> {
        self.bonded.lock().unwrap().clone()
    }

    async fn commission(&self, validator: &Address) -> Result<Commission, LedgerError> {
        self.commission_calls.fetch_add(1, Ordering::SeqCst);
        self.commissions
            .lock()
            .unwrap()
            .get(validator)
            .copied()
            .ok_or_else(|| LedgerError::Query(format!("no commission for {}", validator)))
    }
}

/// Principal group that records every cancel and submission.
pub struct FakeGroup {
    controller: Address,
    principal: Address,
    pub announcements: Mutex<Result<Vec<Announcement>, LedgerError>>,
    pub cancelled: Mutex<Vec<Announcement>>,
    pub failing_cancels: AtomicUsize,
    pub submissions: Mutex<Vec<Vec<Address>>>,
    pub submit_result: Mutex<Result<Submission, LedgerError>>,
    pub submit_delay: Mutex<Duration>,
}

impl FakeGroup {
    pub fn new(controller: &str) -> Self {
        Self {
            controller: addr(controller),
            principal: Address::from(format!("stash-of-{}", controller).as_str()),
            announcements: Mutex::new(Ok(Vec::new())),
            cancelled: Mutex::new(Vec::new()),
            failing_cancels: AtomicUsize::new(0),
            submissions: Mutex::new(Vec::new()),
            submit_result: Mutex::new(Ok(Submission::finalized(BlockHash("0xfinal".into())))),
            submit_delay: Mutex::new(Duration::ZERO),
        }
    }

    pub fn with_announcements(self, announcements: Vec<Announcement>) -> Self {
        *self.announcements.lock().unwrap() = Ok(announcements);
        self
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn submission_count(&self) -> usize {
        self.submissions.lock().unwrap().len()
    }

    pub fn cancel_count(&self) -> usize {
        self.cancelled.lock().unwrap().len()
    }
}

#[async_trait]
impl PrincipalGroup for FakeGroup {
    fn controller(&self) -> &Address {
        &self.controller
    }

    fn principal(&self) -> &Address {
        &self.principal
    }

    async fn announcements(&self) -> Result<Vec<Announcement>, LedgerError> {
        self.announcements.lock().unwrap().clone()
    }

    async fn cancel(&self, announcement: &Announcement) -> Result<(), LedgerError> {
        let should_fail = self
            .failing_cancels
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(LedgerError::Rejected("cancel rejected".into()));
        }
        if let Ok(list) = self.announcements.lock().unwrap().as_mut() {
            if let Some(pos) = list.iter().position(|a| a == announcement) {
                list.remove(pos);
            }
        }
        self.cancelled.lock().unwrap().push(announcement.clone());
        Ok(())
    }

    async fn submit_nomination(&self, targets: &[Address]) -> Result<Submission, LedgerError> {
        let delay = *self.submit_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.submissions.lock().unwrap().push(targets.to_vec());
        self.submit_result.lock().unwrap().clone()
    }
}

/// Notifier that keeps every message.
#[derive(Default)]
pub struct RecordingNotifier {
    pub messages: Mutex<Vec<String>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

/// Progress sink that keeps every event.
#[derive(Default)]
pub struct RecordingSink {
    pub events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingSink {
    pub fn progress_values(&self) -> Vec<f64> {
        self.events.lock().unwrap().iter().map(|e| e.progress).collect()
    }
}

impl ProgressSink for RecordingSink {
    fn emit(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// In-memory store whose writes and name lookups can be made to fail.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: InMemoryStore,
    pub fail_pending: AtomicBool,
    pub fail_record: AtomicBool,
    pub fail_delete: AtomicBool,
    pub fail_names: AtomicBool,
}

impl FlakyStore {
    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    fn check(flag: &AtomicBool, what: &str) -> Result<(), StoreError> {
        if flag.load(Ordering::SeqCst) {
            Err(StoreError::Database(format!("{} failed", what)))
        } else {
            Ok(())
        }
    }
}

impl ActionStore for FlakyStore {
    fn pending_actions(&self) -> Result<Vec<DelayedAction>, StoreError> {
        Self::check(&self.fail_pending, "list")?;
        self.inner.pending_actions()
    }

    fn record_execution(&self, record: &ExecutionRecord) -> Result<(), StoreError> {
        Self::check(&self.fail_record, "record")?;
        self.inner.record_execution(record)
    }

    fn delete_action(&self, key: &ActionKey) -> Result<(), StoreError> {
        Self::check(&self.fail_delete, "delete")?;
        self.inner.delete_action(key)
    }

    fn candidate_name(&self, address: &Address) -> Result<Option<String>, StoreError> {
        Self::check(&self.fail_names, "name lookup")?;
        self.inner.candidate_name(address)
    }
}
