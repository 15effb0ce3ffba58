//! Common types for cross-chain reconciliation
//!
//! `TxRef` is the idempotency key of every request: the 32-byte hash under
//! which the bridging contract records completion.

use std::fmt;
use std::str::FromStr;

use alloy::primitives::{Address, Bytes, B256, U256};

use crate::error::{OracleError, OracleResult};

/// Canonical 32-byte transaction identifier.
///
/// Parsing accepts the hex form with or without a `0x` prefix; both yield the
/// same value, so comparisons and ledger lookups always see the normalized key.
/// Displays as lowercase `0x`-prefixed hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TxRef([u8; 32]);

impl TxRef {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Key type used by the contract's `completed` mapping
    pub fn to_b256(&self) -> B256 {
        B256::from(self.0)
    }

    /// Parse a hash, tolerating a missing `0x` prefix
    pub fn parse(s: &str) -> OracleResult<Self> {
        let trimmed = s.trim();
        let stripped = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if stripped.len() != 64 {
            return Err(OracleError::InvalidInput(format!(
                "transaction hash must be 32 bytes (64 hex chars), got {} chars",
                stripped.len()
            )));
        }

        let bytes = hex::decode(stripped)
            .map_err(|e| OracleError::InvalidInput(format!("invalid transaction hash: {}", e)))?;
        let mut out = [0u8; 32];
        out.copy_from_slice(&bytes);
        Ok(Self(out))
    }
}

impl FromStr for TxRef {
    type Err = OracleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<B256> for TxRef {
    fn from(value: B256) -> Self {
        Self(value.0)
    }
}

impl fmt::Display for TxRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for TxRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxRef({})", self)
    }
}

/// One entry of a recharge batch.
///
/// `target_amount` and `fee` are independent values; any arithmetic between
/// them belongs to the bridging contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RechargeData {
    pub target_address: Address,
    pub target_amount: U256,
    pub fee: U256,
    pub target_data: Bytes,
}

/// A side-chain user's request to redeem to the main chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawRequest {
    /// Main-chain address the funds are paid out to
    pub side_chain_address: String,
    pub amount: U256,
    pub fee: U256,
}

/// Withdrawal as stored by the bridging contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawRecord {
    pub target: Address,
    pub amount: U256,
    pub signatures: Bytes,
    pub completed: bool,
}

/// Projected state of one cross-chain action.
///
/// The oracle stores none of this; it is re-derived from the contract's
/// `completed` ledger on every request. `Completed` and `Refunded` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferState {
    Unseen,
    Submitted,
    Completed,
    Refunded,
}

impl TransferState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferState::Unseen => "unseen",
            TransferState::Submitted => "submitted",
            TransferState::Completed => "completed",
            TransferState::Refunded => "refunded",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferState::Completed | TransferState::Refunded)
    }

    /// Whether `next` is a legal successor. Re-observing the same state is allowed.
    pub fn can_transition_to(&self, next: TransferState) -> bool {
        if *self == next {
            return true;
        }
        matches!(
            (self, next),
            (TransferState::Unseen, TransferState::Submitted)
                | (TransferState::Submitted, TransferState::Completed)
                | (TransferState::Submitted, TransferState::Refunded)
        )
    }

    /// Apply a transition, rejecting anything that leaves a terminal state
    pub fn transition(self, next: TransferState) -> OracleResult<TransferState> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(OracleError::InvalidInput(format!(
                "illegal transfer transition {} -> {}",
                self, next
            )))
        }
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
