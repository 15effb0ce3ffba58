//! Transfer reconciler
//!
//! Decides, for each request kind, whether the chain action still has to be
//! submitted. Every operation follows the same pattern:
//!
//! 1. Read the contract's completion ledger for the normalized identifier
//! 2. If completed, short-circuit with the known result and submit nothing
//! 3. Otherwise submit exactly one transaction and report `Submitted`
//!
//! Two callers racing on the same identifier can both observe "not completed"
//! and both submit; the contract's ledger rejects the second completion. The
//! reconciler only guarantees it never submits for an identifier the ledger
//! already reports as completed.

use std::sync::Arc;

use alloy::primitives::Bytes;
use tracing::{debug, info, warn};

use crate::chain::ChainSubmitter;
use crate::completion::CompletionOracle;
use crate::error::OracleResult;
use crate::metrics::OracleMetrics;
use crate::types::{RechargeData, TransferState, TxRef, WithdrawRecord};

/// Chain-mutating request kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Recharge,
    RefundWithdraw,
    InvalidWithdraw,
    SmallCrossTransfer,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Recharge => "recharge",
            RequestKind::RefundWithdraw => "refund_withdraw",
            RequestKind::InvalidWithdraw => "invalid_withdraw",
            RequestKind::SmallCrossTransfer => "small_cross_transfer",
        }
    }

    /// Terminal state the ledger's completion flag stands for
    fn completed_state(&self) -> TransferState {
        match self {
            RequestKind::InvalidWithdraw | RequestKind::RefundWithdraw => TransferState::Refunded,
            RequestKind::Recharge | RequestKind::SmallCrossTransfer => TransferState::Completed,
        }
    }
}

/// Result of one reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// True iff the ledger already recorded completion before this call
    pub already_completed: bool,
    /// Projected state after this call
    pub state: TransferState,
    /// Side-chain hash of a locally signed submission, when one was made
    pub submitted_tx: Option<TxRef>,
}

impl ReconcileOutcome {
    fn completed(kind: RequestKind) -> Self {
        Self {
            already_completed: true,
            state: kind.completed_state(),
            submitted_tx: None,
        }
    }

    fn submitted(submitted_tx: Option<TxRef>) -> OracleResult<Self> {
        Ok(Self {
            already_completed: false,
            state: TransferState::Unseen.transition(TransferState::Submitted)?,
            submitted_tx,
        })
    }
}

#[derive(Clone)]
pub struct TransferReconciler {
    completion: CompletionOracle,
    submitter: Arc<dyn ChainSubmitter>,
    metrics: Option<Arc<OracleMetrics>>,
}

impl TransferReconciler {
    pub fn new(completion: CompletionOracle, submitter: Arc<dyn ChainSubmitter>) -> Self {
        Self {
            completion,
            submitter,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<OracleMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Ledger check shared by every mutating operation.
    /// Returns the short-circuit outcome when nothing must be submitted.
    async fn check_completed(
        &self,
        kind: RequestKind,
        tx: &TxRef,
    ) -> OracleResult<Option<ReconcileOutcome>> {
        if !self.completion.is_completed(tx).await? {
            return Ok(None);
        }
        info!(kind = kind.as_str(), tx = %tx, "Already processed, skipping submission");
        if let Some(metrics) = &self.metrics {
            metrics.record_already_completed(kind.as_str());
        }
        Ok(Some(ReconcileOutcome::completed(kind)))
    }

    fn record_submission(&self, kind: RequestKind) {
        if let Some(metrics) = &self.metrics {
            metrics.record_submission(kind.as_str());
        }
    }

    /// Refund claim for a withdrawal that failed on the side chain.
    ///
    /// The signature is forwarded untouched; the contract judges its validity.
    pub async fn process_invalid_withdraw(
        &self,
        signature: &str,
        failed_tx: &TxRef,
    ) -> OracleResult<ReconcileOutcome> {
        let kind = RequestKind::InvalidWithdraw;
        if let Some(done) = self.check_completed(kind, failed_tx).await? {
            return Ok(done);
        }

        self.submitter
            .send_invalid_withdraw(signature, failed_tx)
            .await?;
        self.record_submission(kind);
        info!(tx = %failed_tx, "Invalid withdraw submitted");
        ReconcileOutcome::submitted(None)
    }

    /// Small cross-chain transfer keyed by its main-chain transaction.
    ///
    /// When already accepted, the bookkeeping hook is fired in the background;
    /// its failure is logged and does not change the response.
    pub async fn process_small_cross_chain_transfer(
        &self,
        signature: &str,
        raw_tx: &str,
        main_chain_tx: &TxRef,
    ) -> OracleResult<ReconcileOutcome> {
        let kind = RequestKind::SmallCrossTransfer;
        if let Some(done) = self.check_completed(kind, main_chain_tx).await? {
            let submitter = self.submitter.clone();
            let tx = *main_chain_tx;
            tokio::spawn(async move {
                if let Err(e) = submitter.notify_already_accepted(&tx).await {
                    warn!(tx = %tx, error = %e, "Already-accepted notification failed");
                }
            });
            return Ok(done);
        }

        self.submitter
            .submit_small_cross_transfer(signature, raw_tx)
            .await?;
        self.record_submission(kind);
        info!(tx = %main_chain_tx, "Small cross-chain transfer submitted");
        ReconcileOutcome::submitted(None)
    }

    /// Mint a main-chain recharge on the side chain
    pub async fn process_recharge(
        &self,
        main_chain_tx: &TxRef,
        small_recharge_data: &Bytes,
    ) -> OracleResult<ReconcileOutcome> {
        let kind = RequestKind::Recharge;
        if let Some(done) = self.check_completed(kind, main_chain_tx).await? {
            return Ok(done);
        }

        let sent = self
            .submitter
            .submit_recharge(main_chain_tx, small_recharge_data)
            .await?;
        self.record_submission(kind);
        ReconcileOutcome::submitted(Some(sent))
    }

    /// Refund a side-chain withdrawal through `refundWithdraw`
    pub async fn process_refund_withdraw(
        &self,
        withdraw_tx: &TxRef,
    ) -> OracleResult<ReconcileOutcome> {
        let kind = RequestKind::RefundWithdraw;
        if let Some(done) = self.check_completed(kind, withdraw_tx).await? {
            return Ok(done);
        }

        let sent = self.submitter.submit_refund_withdraw(withdraw_tx).await?;
        self.record_submission(kind);
        ReconcileOutcome::submitted(Some(sent))
    }

    /// Keep only the withdrawals the ledger reports as completed.
    ///
    /// Input order is preserved and duplicates are not collapsed. No submission
    /// happens here.
    pub async fn filter_processed_withdrawals(&self, txs: &[TxRef]) -> OracleResult<Vec<TxRef>> {
        self.filter_processed_by_key(txs, |tx| Ok(*tx)).await
    }

    /// Same filter over arbitrary items, each keyed by the identifier `key`
    /// derives from it. Every key is derived before the first ledger read, so
    /// one bad entry rejects the batch without touching the chain.
    pub async fn filter_processed_by_key<T, F>(&self, items: &[T], key: F) -> OracleResult<Vec<T>>
    where
        T: Clone,
        F: Fn(&T) -> OracleResult<TxRef>,
    {
        let refs = items.iter().map(key).collect::<OracleResult<Vec<_>>>()?;
        let flags = self.completion.completion_flags(&refs).await?;
        let processed: Vec<T> = items
            .iter()
            .zip(flags)
            .filter_map(|(item, done)| done.then(|| item.clone()))
            .collect();
        debug!(
            requested = items.len(),
            processed = processed.len(),
            "Filtered processed withdrawals"
        );
        Ok(processed)
    }

    /// Recharge entries recorded for a main-chain transaction
    pub async fn recharge_records(&self, main_chain_tx: &TxRef) -> OracleResult<Vec<RechargeData>> {
        self.completion.reader().recharge_data(main_chain_tx).await
    }

    /// Stored withdrawal plus its ledger completion flag
    pub async fn withdraw_record(&self, withdraw_tx: &TxRef) -> OracleResult<WithdrawRecord> {
        let (mut record, completed) = tokio::try_join!(
            self.completion.reader().withdraw_data(withdraw_tx),
            self.completion.is_completed(withdraw_tx),
        )?;
        record.completed = completed;
        Ok(record)
    }
}
