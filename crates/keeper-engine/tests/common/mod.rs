//! Ledger fakes for the engine integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use keeper_core::error::LedgerError;
use keeper_core::ports::{ChainClient, Notifier, PrincipalGroup, ProgressSink};
use keeper_core::types::{
    Address, Announcement, Balance, BlockHash, BlockNumber, CallHash, Commission, DelayedAction,
    EraIndex, Submission,
};
use keeper_core::ProgressEvent;

pub fn addr(s: &str) -> Address {
    Address::from(s)
}

pub fn action(block: BlockNumber, controller: &str, targets: &[&str], hash: &str) -> DelayedAction {
    DelayedAction {
        announced_block: block,
        principal: addr(&format!("stash-{}", controller)),
        controller: addr(controller),
        targets: targets.iter().map(|t| addr(t)).collect(),
        action_hash: CallHash::new(hash),
    }
}

pub struct Chain {
    pub block: Mutex<BlockNumber>,
    pub era: EraIndex,
    pub commissions: Mutex<HashMap<Address, Commission>>,
}

impl Chain {
    pub fn new(block: BlockNumber, era: EraIndex, commissions: &[(&str, u32)]) -> Arc<Self> {
        Arc::new(Self {
            block: Mutex::new(block),
            era,
            commissions: Mutex::new(
                commissions
                    .iter()
                    .map(|(a, p)| (addr(a), Commission::from_percent(*p)))
                    .collect(),
            ),
        })
    }

    pub fn set_commission(&self, target: &str, percent: u32) {
        self.commissions
            .lock()
            .unwrap()
            .insert(addr(target), Commission::from_percent(percent));
    }

    pub fn advance_to(&self, block: BlockNumber) {
        *self.block.lock().unwrap() = block;
    }
}

#[async_trait]
impl ChainClient for Chain {
    async fn latest_block(&self) -> Result<BlockNumber, LedgerError> {
        Ok(*self.block.lock().unwrap())
    }

    async fn current_era(&self) -> Result<EraIndex, LedgerError> {
        Ok(self.era)
    }

    async fn bonded_amount(&self, _stash: &Address) -> Result<Balance, LedgerError> {
        Ok(5_000_000_000_000)
    }

    async fn commission(&self, validator: &Address) -> Result<Commission, LedgerError> {
        self.commissions
            .lock()
            .unwrap()
            .get(validator)
            .copied()
            .ok_or_else(|| LedgerError::Query(format!("unknown validator {}", validator)))
    }
}

pub struct Group {
    controller: Address,
    principal: Address,
    pub announcements: Mutex<Vec<Announcement>>,
    pub cancelled: Mutex<Vec<CallHash>>,
    pub submitted: Mutex<Vec<Vec<Address>>>,
}

impl Group {
    pub fn new(controller: &str, announced: &[&str]) -> Arc<Self> {
        let principal = addr(&format!("stash-{}", controller));
        Arc::new(Self {
            controller: addr(controller),
            announcements: Mutex::new(
                announced
                    .iter()
                    .map(|h| Announcement {
                        call_hash: CallHash::new(*h),
                        real: principal.clone(),
                        height: 0,
                    })
                    .collect(),
            ),
            principal,
            cancelled: Mutex::new(Vec::new()),
            submitted: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl PrincipalGroup for Group {
    fn controller(&self) -> &Address {
        &self.controller
    }

    fn principal(&self) -> &Address {
        &self.principal
    }

    async fn announcements(&self) -> Result<Vec<Announcement>, LedgerError> {
        Ok(self.announcements.lock().unwrap().clone())
    }

    async fn cancel(&self, announcement: &Announcement) -> Result<(), LedgerError> {
        self.announcements
            .lock()
            .unwrap()
            .retain(|a| a != announcement);
        self.cancelled
            .lock()
            .unwrap()
            .push(announcement.call_hash.clone());
        Ok(())
    }

    async fn submit_nomination(&self, targets: &[Address]) -> Result<Submission, LedgerError> {
        self.submitted.lock().unwrap().push(targets.to_vec());
        Ok(Submission::finalized(BlockHash("0xf1na1".into())))
    }
}

#[derive(Default)]
pub struct Messages(pub Mutex<Vec<String>>);

#[async_trait]
impl Notifier for Messages {
    async fn notify(&self, message: &str) {
        self.0.lock().unwrap().push(message.to_string());
    }
}

#[derive(Default)]
pub struct Events(pub Mutex<Vec<ProgressEvent>>);

impl ProgressSink for Events {
    fn emit(&self, event: ProgressEvent) {
        self.0.lock().unwrap().push(event);
    }
}
