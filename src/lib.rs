//! Side-chain bridge oracle - Library interface
//!
//! Reconciles recharge, withdraw, invalid-withdraw and small cross-chain
//! transfer requests against the bridging contract's completion ledger, so
//! that no chain-mutating transaction is knowingly submitted twice.
//!
//! Re-exports internal modules for use in integration tests.

pub mod chain;
pub mod codec;
pub mod completion;
pub mod config;
pub mod contracts;
pub mod dispatcher;
pub mod error;
pub mod evm_client;
pub mod metrics;
pub mod reconciler;
pub mod server;
pub mod types;

#[cfg(test)]
mod testing;
