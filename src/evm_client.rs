//! Side-chain client for the bridging contract
//!
//! Implements both chain collaborators against a side-chain node:
//!
//! - Ledger and record reads go through alloy contract calls on a read-only provider.
//! - `Recharge` and `refundWithdraw` are signed locally and sent through a
//!   provider built with `with_recommended_fillers()`, which fills nonce, gas
//!   limit and fees.
//! - Invalid-withdraw claims and small cross-chain transfers are handed to the
//!   node's own JSON-RPC extension methods, which build and sign the
//!   transaction node-side.
//!
//! # Usage
//!
//! ```ignore
//! let client = EvmBridgeClient::new(rpc_url, bridge_address, None, Duration::from_secs(30))?;
//! let done = client.is_completed(&tx).await?;
//! ```

use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use alloy::network::EthereumWallet;
use alloy::primitives::{Address, Bytes};
use alloy::providers::{Provider, ProviderBuilder, RootProvider};
use alloy::rpc::client::RpcClient;
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::http::{Client as HttpClient, Http};
use async_trait::async_trait;
use eyre::{eyre, WrapErr};
use reqwest::Url;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::chain::{ChainReader, ChainSubmitter};
use crate::contracts::ELAMinter;
use crate::error::{OracleError, OracleResult};
use crate::types::{RechargeData, TxRef, WithdrawRecord};

/// Node extension: forward a signed refund claim for a failed withdrawal
pub const SEND_INVALID_WITHDRAW_METHOD: &str = "eth_sendInvalidWithdrawTransaction";
/// Node extension: forward a signed small cross-chain transfer
pub const RECEIVED_SMALL_CROSS_TX_METHOD: &str = "eth_receivedSmallCrossTx";
/// Node extension: bookkeeping for a small transfer already accepted on-chain
pub const SMALL_CROSS_TX_SUCCESS_METHOD: &str = "eth_onSmallCrossTxSuccess";

/// Client for the bridging contract on the side chain
pub struct EvmBridgeClient {
    rpc_url: Url,
    bridge_address: Address,
    /// Read-only provider for contract views
    provider: RootProvider<Http<HttpClient>>,
    /// Signer for locally built transactions; absent in read/forward-only deployments
    signer: Option<PrivateKeySigner>,
    /// Shared by every provider and extension call; carries the per-call timeout
    http: HttpClient,
    next_request_id: AtomicU64,
}

impl EvmBridgeClient {
    pub fn new(
        rpc_url: &str,
        bridge_address: &str,
        private_key: Option<&str>,
        timeout: Duration,
    ) -> eyre::Result<Self> {
        let bridge_address =
            Address::from_str(bridge_address).wrap_err("Invalid bridge address")?;
        let signer = private_key
            .map(|key| key.parse::<PrivateKeySigner>())
            .transpose()
            .wrap_err("Invalid private key")?;

        let rpc_url: Url = rpc_url
            .parse()
            .map_err(|e| eyre!("Invalid RPC URL: {}", e))?;

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .wrap_err("Failed to build HTTP client")?;

        let provider = ProviderBuilder::new().on_client(RpcClient::new(
            Http::with_client(http.clone(), rpc_url.clone()),
            false,
        ));

        match &signer {
            Some(signer) => info!(
                oracle_address = %signer.address(),
                bridge = %bridge_address,
                "Bridge client initialized with signer"
            ),
            None => info!(
                bridge = %bridge_address,
                "Bridge client initialized without signer; recharge and refund submission disabled"
            ),
        }

        Ok(Self {
            rpc_url,
            bridge_address,
            provider,
            signer,
            http,
            next_request_id: AtomicU64::new(1),
        })
    }

    pub fn bridge_address(&self) -> Address {
        self.bridge_address
    }

    /// Address of the configured signer, if any
    pub fn signer_address(&self) -> Option<Address> {
        self.signer.as_ref().map(|s| s.address())
    }

    /// Provider that fills nonce, gas and fees and signs with the oracle key
    fn signing_provider(&self) -> OracleResult<impl Provider<Http<HttpClient>>> {
        let signer = self.signer.as_ref().ok_or_else(|| {
            OracleError::SubmissionFailed("no signer configured for local submission".to_string())
        })?;
        let transport = Http::with_client(self.http.clone(), self.rpc_url.clone());

        Ok(ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(EthereumWallet::from(signer.clone()))
            .on_client(RpcClient::new(transport, false)))
    }

    /// Call a node JSON-RPC method and return its `result`
    async fn rpc_call(&self, method: &str, params: Value) -> OracleResult<Value> {
        let id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        let body = build_rpc_request(id, method, params);

        debug!(method, id, "Calling side-chain node");

        let resp = self
            .http
            .post(self.rpc_url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| OracleError::SubmissionFailed(format!("{} request failed: {}", method, e)))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(OracleError::SubmissionFailed(format!(
                "{} returned HTTP {}: {}",
                method, status, text
            )));
        }

        let json: Value = resp.json().await.map_err(|e| {
            OracleError::SubmissionFailed(format!("{} returned invalid JSON: {}", method, e))
        })?;

        extract_rpc_result(method, json)
    }
}

/// JSON-RPC 2.0 request body for the node
fn build_rpc_request(id: u64, method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
        "params": params,
    })
}

/// Pull `result` out of a node response, turning a JSON-RPC error into `SubmissionFailed`
fn extract_rpc_result(method: &str, mut json: Value) -> OracleResult<Value> {
    let error = json.get("error").cloned().unwrap_or(Value::Null);
    if !error.is_null() {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(OracleError::SubmissionFailed(format!(
            "{} rejected by node: {}",
            method, message
        )));
    }
    Ok(json
        .get_mut("result")
        .map(Value::take)
        .unwrap_or(Value::Null))
}

#[async_trait]
impl ChainReader for EvmBridgeClient {
    async fn is_completed(&self, tx: &TxRef) -> OracleResult<bool> {
        let contract = ELAMinter::new(self.bridge_address, &self.provider);
        let result = contract
            .completed(tx.to_b256())
            .call()
            .await
            .map_err(|e| OracleError::QueryUnavailable(format!("completed({}): {}", tx, e)))?;

        debug!(tx = %tx, completed = result._0, "Queried completion ledger");
        Ok(result._0)
    }

    async fn recharge_data(&self, tx: &TxRef) -> OracleResult<Vec<RechargeData>> {
        let contract = ELAMinter::new(self.bridge_address, &self.provider);
        let result = contract
            .getRechargeData(tx.to_b256())
            .call()
            .await
            .map_err(|e| {
                OracleError::QueryUnavailable(format!("getRechargeData({}): {}", tx, e))
            })?;

        Ok(result._0.into_iter().map(RechargeData::from).collect())
    }

    async fn withdraw_data(&self, tx: &TxRef) -> OracleResult<WithdrawRecord> {
        let contract = ELAMinter::new(self.bridge_address, &self.provider);
        let result = contract
            .getWithdrawData(tx.to_b256())
            .call()
            .await
            .map_err(|e| {
                OracleError::QueryUnavailable(format!("getWithdrawData({}): {}", tx, e))
            })?;

        Ok(WithdrawRecord {
            target: result._0,
            amount: result._1,
            signatures: result._2,
            completed: false,
        })
    }
}

#[async_trait]
impl ChainSubmitter for EvmBridgeClient {
    async fn send_invalid_withdraw(&self, signature: &str, tx: &TxRef) -> OracleResult<()> {
        self.rpc_call(
            SEND_INVALID_WITHDRAW_METHOD,
            json!([signature, tx.to_string()]),
        )
        .await?;
        info!(tx = %tx, "Invalid withdraw transaction forwarded");
        Ok(())
    }

    async fn submit_small_cross_transfer(&self, signature: &str, raw_tx: &str) -> OracleResult<()> {
        self.rpc_call(RECEIVED_SMALL_CROSS_TX_METHOD, json!([signature, raw_tx]))
            .await?;
        info!("Small cross-chain transaction forwarded");
        Ok(())
    }

    async fn notify_already_accepted(&self, tx: &TxRef) -> OracleResult<()> {
        self.rpc_call(SMALL_CROSS_TX_SUCCESS_METHOD, json!([tx.to_string()]))
            .await?;
        Ok(())
    }

    async fn submit_recharge(&self, tx: &TxRef, small_recharge_data: &Bytes) -> OracleResult<TxRef> {
        let provider = self.signing_provider()?;

        let contract = ELAMinter::new(self.bridge_address, &provider);
        let pending = contract
            .Recharge(tx.to_b256(), small_recharge_data.clone())
            .send()
            .await
            .map_err(|e| OracleError::SubmissionFailed(format!("Recharge({}): {}", tx, e)))?;

        let tx_hash = TxRef::from(*pending.tx_hash());
        info!(recharge = %tx, tx_hash = %tx_hash, "Recharge transaction sent");
        Ok(tx_hash)
    }

    async fn submit_refund_withdraw(&self, tx: &TxRef) -> OracleResult<TxRef> {
        let provider = self.signing_provider()?;

        let contract = ELAMinter::new(self.bridge_address, &provider);
        let pending = contract
            .refundWithdraw(tx.to_b256())
            .send()
            .await
            .map_err(|e| {
                warn!(withdraw = %tx, error = %e, "refundWithdraw submission failed");
                OracleError::SubmissionFailed(format!("refundWithdraw({}): {}", tx, e))
            })?;

        let tx_hash = TxRef::from(*pending.tx_hash());
        info!(withdraw = %tx, tx_hash = %tx_hash, "Refund withdraw transaction sent");
        Ok(tx_hash)
    }
}
