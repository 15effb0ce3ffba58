//! JSON-RPC request dispatcher
//!
//! One `dispatch` call per inbound request. Parses the method and its params,
//! routes to the reconciler and wraps the outcome in a JSON-RPC 2.0 envelope.
//! Failures become an error envelope with a sanitized message; the detail is
//! logged here and never returned.

use std::str::FromStr;
use std::sync::Arc;

use alloy::primitives::{Bytes, U256};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::codec;
use crate::error::{OracleError, OracleResult, INVALID_REQUEST, METHOD_NOT_FOUND};
use crate::metrics::OracleMetrics;
use crate::reconciler::TransferReconciler;
use crate::types::{RechargeData, TxRef, WithdrawRecord, WithdrawRequest};

/// Methods served on the JSON-RPC endpoint.
///
/// Wire names are fixed by the existing clients, misspellings included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    ProcessedInvalidWithdraw,
    ReceivedInvalidWithdraw,
    SmallCrossChainTransaction,
    Recharge,
    RefundWithdraw,
    GetRechargeData,
    DecodeRechargeData,
    GetWithdrawData,
    EncodeWithdraw,
}

impl Method {
    pub const ALL: [Method; 9] = [
        Method::ProcessedInvalidWithdraw,
        Method::ReceivedInvalidWithdraw,
        Method::SmallCrossChainTransaction,
        Method::Recharge,
        Method::RefundWithdraw,
        Method::GetRechargeData,
        Method::DecodeRechargeData,
        Method::GetWithdrawData,
        Method::EncodeWithdraw,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::ProcessedInvalidWithdraw => "processedInvalidWithdrawtx",
            Method::ReceivedInvalidWithdraw => "receivedInvaliedwithrawtx",
            Method::SmallCrossChainTransaction => "smallCrossChainTransaction",
            Method::Recharge => "recharge",
            Method::RefundWithdraw => "refundWithdraw",
            Method::GetRechargeData => "getRechargeData",
            Method::DecodeRechargeData => "decodeRechargeData",
            Method::GetWithdrawData => "getWithdrawData",
            Method::EncodeWithdraw => "encodeWithdraw",
        }
    }
}

impl FromStr for Method {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
            .ok_or(())
    }
}

/// Failure as reported to the client
#[derive(Debug, Clone, PartialEq, Eq)]
struct RpcError {
    code: i64,
    message: String,
    kind: &'static str,
}

impl From<&OracleError> for RpcError {
    fn from(e: &OracleError) -> Self {
        Self {
            code: e.code(),
            message: e.public_message(),
            kind: e.kind(),
        }
    }
}

#[derive(Deserialize)]
struct ProcessedTxsParams {
    txs: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InvalidWithdrawParams {
    signature: String,
    tx_hash: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SmallTransferParams {
    signature: String,
    raw_tx: String,
    tx_hash: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RechargeParams {
    tx_hash: String,
    #[serde(default)]
    small_recharge_data: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TxHashParams {
    tx_hash: String,
}

#[derive(Deserialize)]
struct DataParams {
    data: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EncodeWithdrawParams {
    side_chain_address: String,
    amount: Value,
    fee: Value,
}

pub struct RequestDispatcher {
    reconciler: TransferReconciler,
    metrics: Option<Arc<OracleMetrics>>,
}

impl RequestDispatcher {
    pub fn new(reconciler: TransferReconciler) -> Self {
        Self {
            reconciler,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<OracleMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Handle one JSON-RPC request object and produce its response envelope
    pub async fn dispatch(&self, request: Value) -> Value {
        let id = request.get("id").cloned().unwrap_or(Value::Null);

        let Some(method_name) = request.get("method").and_then(Value::as_str) else {
            self.record("invalid", "invalid_request");
            return error_envelope(
                id,
                RpcError {
                    code: INVALID_REQUEST,
                    message: "invalid request: missing method".to_string(),
                    kind: "invalid_request",
                },
            );
        };

        let Ok(method) = method_name.parse::<Method>() else {
            debug!(method = method_name, "Unknown method");
            self.record("unknown", "method_not_found");
            return error_envelope(
                id,
                RpcError {
                    code: METHOD_NOT_FOUND,
                    message: format!("method not found: {}", method_name),
                    kind: "method_not_found",
                },
            );
        };

        let params = request.get("params").cloned().unwrap_or(Value::Null);
        debug!(method = method.as_str(), "Dispatching request");

        match self.route(method, params).await {
            Ok(result) => {
                self.record(method.as_str(), "ok");
                success_envelope(id, result)
            }
            Err(e) => {
                warn!(method = method.as_str(), error = %e, "Request failed");
                let rpc_error = RpcError::from(&e);
                self.record(method.as_str(), rpc_error.kind);
                error_envelope(id, rpc_error)
            }
        }
    }

    async fn route(&self, method: Method, params: Value) -> OracleResult<Value> {
        match method {
            Method::ProcessedInvalidWithdraw => {
                let p: ProcessedTxsParams = parse_params(params)?;
                // echo the caller's strings, not the normalized form
                let processed = self
                    .reconciler
                    .filter_processed_by_key(&p.txs, |s| TxRef::parse(s))
                    .await?;
                Ok(json!(processed))
            }
            Method::ReceivedInvalidWithdraw => {
                let p: InvalidWithdrawParams = parse_params(params)?;
                require_non_empty("signature", &p.signature)?;
                let tx = TxRef::parse(&p.tx_hash)?;
                let outcome = self
                    .reconciler
                    .process_invalid_withdraw(&p.signature, &tx)
                    .await?;
                Ok(json!(outcome.already_completed))
            }
            Method::SmallCrossChainTransaction => {
                let p: SmallTransferParams = parse_params(params)?;
                require_non_empty("signature", &p.signature)?;
                require_non_empty("rawTx", &p.raw_tx)?;
                let tx = TxRef::parse(&p.tx_hash)?;
                let outcome = self
                    .reconciler
                    .process_small_cross_chain_transfer(&p.signature, &p.raw_tx, &tx)
                    .await?;
                Ok(json!(outcome.already_completed))
            }
            Method::Recharge => {
                let p: RechargeParams = parse_params(params)?;
                let tx = TxRef::parse(&p.tx_hash)?;
                let data = match p.small_recharge_data.as_deref() {
                    Some(hex_data) => parse_hex_bytes("smallRechargeData", hex_data)?,
                    None => Bytes::new(),
                };
                let outcome = self.reconciler.process_recharge(&tx, &data).await?;
                Ok(json!(outcome.already_completed))
            }
            Method::RefundWithdraw => {
                let p: TxHashParams = parse_params(params)?;
                let tx = TxRef::parse(&p.tx_hash)?;
                let outcome = self.reconciler.process_refund_withdraw(&tx).await?;
                Ok(json!(outcome.already_completed))
            }
            Method::GetRechargeData => {
                let p: TxHashParams = parse_params(params)?;
                let tx = TxRef::parse(&p.tx_hash)?;
                let entries = self.reconciler.recharge_records(&tx).await?;
                Ok(recharge_entries_json(&entries))
            }
            Method::DecodeRechargeData => {
                let p: DataParams = parse_params(params)?;
                let entries = codec::decode_hex(&p.data)?;
                Ok(recharge_entries_json(&entries))
            }
            Method::GetWithdrawData => {
                let p: TxHashParams = parse_params(params)?;
                let tx = TxRef::parse(&p.tx_hash)?;
                let record = self.reconciler.withdraw_record(&tx).await?;
                Ok(withdraw_record_json(&record))
            }
            Method::EncodeWithdraw => {
                let p: EncodeWithdrawParams = parse_params(params)?;
                require_non_empty("sideChainAddress", &p.side_chain_address)?;
                let request = WithdrawRequest {
                    side_chain_address: p.side_chain_address,
                    amount: parse_amount("amount", &p.amount)?,
                    fee: parse_amount("fee", &p.fee)?,
                };
                let call_data = codec::encode_withdraw_call(&request);
                Ok(json!(format!("0x{}", hex::encode(call_data))))
            }
        }
    }

    fn record(&self, method: &str, outcome: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.record_request(method, outcome);
        }
    }
}

fn success_envelope(id: Value, result: Value) -> Value {
    json!({
        "error": null,
        "id": id,
        "jsonrpc": "2.0",
        "result": result,
    })
}

fn error_envelope(id: Value, error: RpcError) -> Value {
    json!({
        "error": {
            "code": error.code,
            "message": error.message,
        },
        "id": id,
        "jsonrpc": "2.0",
        "result": null,
    })
}

fn parse_params<T: DeserializeOwned>(params: Value) -> OracleResult<T> {
    if params.is_null() {
        return Err(OracleError::InvalidInput("missing params".to_string()));
    }
    serde_json::from_value(params).map_err(|e| OracleError::InvalidInput(e.to_string()))
}

fn require_non_empty(field: &str, value: &str) -> OracleResult<()> {
    if value.trim().is_empty() {
        return Err(OracleError::InvalidInput(format!("{} must not be empty", field)));
    }
    Ok(())
}

fn parse_hex_bytes(field: &str, value: &str) -> OracleResult<Bytes> {
    let stripped = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(stripped)
        .map(Bytes::from)
        .map_err(|e| OracleError::InvalidInput(format!("{} is not valid hex: {}", field, e)))
}

/// Amounts arrive as decimal strings, `0x` hex strings, or JSON integers
fn parse_amount(field: &str, value: &Value) -> OracleResult<U256> {
    let invalid = || OracleError::InvalidInput(format!("{} must be an unsigned integer", field));
    match value {
        Value::String(s) => U256::from_str(s.trim()).map_err(|_| invalid()),
        Value::Number(n) => n.as_u64().map(U256::from).ok_or_else(invalid),
        _ => Err(invalid()),
    }
}

fn recharge_entries_json(entries: &[RechargeData]) -> Value {
    Value::Array(
        entries
            .iter()
            .map(|e| {
                json!({
                    "targetAddress": e.target_address.to_string(),
                    "targetAmount": e.target_amount.to_string(),
                    "fee": e.fee.to_string(),
                    "targetData": e.target_data.to_string(),
                })
            })
            .collect(),
    )
}

fn withdraw_record_json(record: &WithdrawRecord) -> Value {
    json!({
        "target": record.target.to_string(),
        "amount": record.amount.to_string(),
        "signatures": record.signatures.to_string(),
        "completed": record.completed,
    })
}
