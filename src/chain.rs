//! Chain collaborator interfaces
//!
//! The reconciler talks to the side chain only through these two traits, so
//! the production client and in-memory fakes are interchangeable.

use alloy::primitives::Bytes;
use async_trait::async_trait;

use crate::error::OracleResult;
use crate::types::{RechargeData, TxRef, WithdrawRecord};

/// Read-only view of the bridging contract.
///
/// Failures are `QueryUnavailable`; an unreachable node never reads as "not completed".
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Query the contract's `completed` ledger for an already-normalized key
    async fn is_completed(&self, tx: &TxRef) -> OracleResult<bool>;

    /// Recharge entries recorded for a main-chain transaction
    async fn recharge_data(&self, tx: &TxRef) -> OracleResult<Vec<RechargeData>>;

    /// Stored data of a side-chain withdrawal (completion flag left false)
    async fn withdraw_data(&self, tx: &TxRef) -> OracleResult<WithdrawRecord>;
}

/// Chain-mutating side of the bridge. Failures are `SubmissionFailed`.
#[async_trait]
pub trait ChainSubmitter: Send + Sync {
    /// Forward a signed invalid-withdraw refund claim for `tx`
    async fn send_invalid_withdraw(&self, signature: &str, tx: &TxRef) -> OracleResult<()>;

    /// Forward a signed small cross-chain transfer
    async fn submit_small_cross_transfer(&self, signature: &str, raw_tx: &str) -> OracleResult<()>;

    /// Bookkeeping hook for a small transfer the contract already accepted
    async fn notify_already_accepted(&self, tx: &TxRef) -> OracleResult<()>;

    /// Submit `Recharge(elaHash, smallRechargeData)`, returning the side-chain tx hash
    async fn submit_recharge(&self, tx: &TxRef, small_recharge_data: &Bytes) -> OracleResult<TxRef>;

    /// Submit `refundWithdraw(withdrawTxID)`, returning the side-chain tx hash
    async fn submit_refund_withdraw(&self, tx: &TxRef) -> OracleResult<TxRef>;
}
