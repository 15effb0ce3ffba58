//! In-memory chain used by unit tests.
//!
//! Records every ledger query and submission so tests can assert exactly what
//! reached the chain.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::Bytes;
use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::chain::{ChainReader, ChainSubmitter};
use crate::error::{OracleError, OracleResult};
use crate::types::{RechargeData, TxRef, WithdrawRecord};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    InvalidWithdraw { signature: String, tx: TxRef },
    SmallCrossTransfer { signature: String, raw_tx: String },
    Recharge { tx: TxRef, data: Bytes },
    RefundWithdraw { tx: TxRef },
}

#[derive(Clone)]
pub struct FakeChain {
    completed: Arc<Mutex<HashSet<TxRef>>>,
    completion_queries: Arc<Mutex<Vec<TxRef>>>,
    read_delays: Arc<Mutex<HashMap<TxRef, Duration>>>,
    reads_in_flight: Arc<AtomicUsize>,
    peak_reads_in_flight: Arc<AtomicUsize>,
    read_failure: Arc<Mutex<Option<String>>>,
    submit_failure: Arc<Mutex<Option<String>>>,
    notify_failure: Arc<Mutex<Option<String>>>,
    submissions: Arc<Mutex<Vec<Submission>>>,
    recharges: Arc<Mutex<HashMap<TxRef, Vec<RechargeData>>>>,
    withdraws: Arc<Mutex<HashMap<TxRef, WithdrawRecord>>>,
    notified_tx: broadcast::Sender<TxRef>,
}

impl Default for FakeChain {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeChain {
    pub fn new() -> Self {
        Self {
            completed: Default::default(),
            completion_queries: Default::default(),
            read_delays: Default::default(),
            reads_in_flight: Default::default(),
            peak_reads_in_flight: Default::default(),
            read_failure: Default::default(),
            submit_failure: Default::default(),
            notify_failure: Default::default(),
            submissions: Default::default(),
            recharges: Default::default(),
            withdraws: Default::default(),
            notified_tx: broadcast::channel(64).0,
        }
    }

    pub fn mark_completed(&self, tx: TxRef) {
        self.completed.lock().unwrap().insert(tx);
    }

    /// Hold every completion read of `tx` for `delay` before answering
    pub fn delay_reads(&self, tx: TxRef, delay: Duration) {
        self.read_delays.lock().unwrap().insert(tx, delay);
    }

    /// Highest number of completion reads observed in flight at once
    pub fn peak_reads_in_flight(&self) -> usize {
        self.peak_reads_in_flight.load(Ordering::SeqCst)
    }

    pub fn fail_reads(&self, reason: &str) {
        *self.read_failure.lock().unwrap() = Some(reason.to_string());
    }

    pub fn fail_submissions(&self, reason: &str) {
        *self.submit_failure.lock().unwrap() = Some(reason.to_string());
    }

    pub fn fail_notifications(&self, reason: &str) {
        *self.notify_failure.lock().unwrap() = Some(reason.to_string());
    }

    pub fn set_recharge_data(&self, tx: TxRef, entries: Vec<RechargeData>) {
        self.recharges.lock().unwrap().insert(tx, entries);
    }

    pub fn set_withdraw_data(&self, tx: TxRef, record: WithdrawRecord) {
        self.withdraws.lock().unwrap().insert(tx, record);
    }

    pub fn completion_queries(&self) -> Vec<TxRef> {
        self.completion_queries.lock().unwrap().clone()
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions.lock().unwrap().clone()
    }

    /// Receives every `notify_already_accepted` call, including failed ones
    pub fn subscribe_notifications(&self) -> broadcast::Receiver<TxRef> {
        self.notified_tx.subscribe()
    }

    fn check_reads(&self) -> OracleResult<()> {
        match self.read_failure.lock().unwrap().as_ref() {
            Some(reason) => Err(OracleError::QueryUnavailable(reason.clone())),
            None => Ok(()),
        }
    }

    fn record(&self, submission: Submission) -> OracleResult<()> {
        if let Some(reason) = self.submit_failure.lock().unwrap().as_ref() {
            return Err(OracleError::SubmissionFailed(reason.clone()));
        }
        self.submissions.lock().unwrap().push(submission);
        Ok(())
    }
}

#[async_trait]
impl ChainReader for FakeChain {
    async fn is_completed(&self, tx: &TxRef) -> OracleResult<bool> {
        self.completion_queries.lock().unwrap().push(*tx);

        let in_flight = self.reads_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_reads_in_flight.fetch_max(in_flight, Ordering::SeqCst);
        let delay = self.read_delays.lock().unwrap().get(tx).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.reads_in_flight.fetch_sub(1, Ordering::SeqCst);

        self.check_reads()?;
        Ok(self.completed.lock().unwrap().contains(tx))
    }

    async fn recharge_data(&self, tx: &TxRef) -> OracleResult<Vec<RechargeData>> {
        self.check_reads()?;
        Ok(self
            .recharges
            .lock()
            .unwrap()
            .get(tx)
            .cloned()
            .unwrap_or_default())
    }

    async fn withdraw_data(&self, tx: &TxRef) -> OracleResult<WithdrawRecord> {
        self.check_reads()?;
        self.withdraws
            .lock()
            .unwrap()
            .get(tx)
            .cloned()
            .ok_or_else(|| OracleError::QueryUnavailable(format!("no withdraw {}", tx)))
    }
}

#[async_trait]
impl ChainSubmitter for FakeChain {
    async fn send_invalid_withdraw(&self, signature: &str, tx: &TxRef) -> OracleResult<()> {
        self.record(Submission::InvalidWithdraw {
            signature: signature.to_string(),
            tx: *tx,
        })
    }

    async fn submit_small_cross_transfer(&self, signature: &str, raw_tx: &str) -> OracleResult<()> {
        self.record(Submission::SmallCrossTransfer {
            signature: signature.to_string(),
            raw_tx: raw_tx.to_string(),
        })
    }

    async fn notify_already_accepted(&self, tx: &TxRef) -> OracleResult<()> {
        let _ = self.notified_tx.send(*tx);
        match self.notify_failure.lock().unwrap().as_ref() {
            Some(reason) => Err(OracleError::SubmissionFailed(reason.clone())),
            None => Ok(()),
        }
    }

    async fn submit_recharge(&self, tx: &TxRef, small_recharge_data: &Bytes) -> OracleResult<TxRef> {
        self.record(Submission::Recharge {
            tx: *tx,
            data: small_recharge_data.clone(),
        })?;
        Ok(TxRef::from_bytes([0xEE; 32]))
    }

    async fn submit_refund_withdraw(&self, tx: &TxRef) -> OracleResult<TxRef> {
        self.record(Submission::RefundWithdraw { tx: *tx })?;
        Ok(TxRef::from_bytes([0xEF; 32]))
    }
}
