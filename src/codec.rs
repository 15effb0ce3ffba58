//! RechargeData codec
//!
//! Encodes and decodes the bridging contract's `RechargeData[]` tuple array in
//! its canonical ABI form, the same bytes `getRechargeData` returns and
//! `decodeRechargeData` accepts. Pure functions, no chain access.
//!
//! Decoding is strict: a buffer is accepted only if re-encoding the decoded
//! entries reproduces it byte for byte, so truncated buffers, wrong element
//! counts and non-canonical offsets or padding are all rejected.

use alloy::sol_types::{SolCall, SolValue};

use crate::contracts::ELAMinter;
use crate::error::{OracleError, OracleResult};
use crate::types::{RechargeData, WithdrawRequest};

impl From<ELAMinter::RechargeData> for RechargeData {
    fn from(raw: ELAMinter::RechargeData) -> Self {
        Self {
            target_address: raw.targetAddress,
            target_amount: raw.targetAmount,
            fee: raw.fee,
            target_data: raw.targetData,
        }
    }
}

impl From<&RechargeData> for ELAMinter::RechargeData {
    fn from(data: &RechargeData) -> Self {
        Self {
            targetAddress: data.target_address,
            targetAmount: data.target_amount,
            fee: data.fee,
            targetData: data.target_data.clone(),
        }
    }
}

/// Decode a contract-encoded `RechargeData[]`
pub fn decode(raw: &[u8]) -> OracleResult<Vec<RechargeData>> {
    let entries = <Vec<ELAMinter::RechargeData>>::abi_decode(raw, true)
        .map_err(|e| OracleError::MalformedEncoding(e.to_string()))?;

    if entries.abi_encode() != raw {
        return Err(OracleError::MalformedEncoding(
            "buffer is not the canonical encoding of a RechargeData[]".to_string(),
        ));
    }

    Ok(entries.into_iter().map(RechargeData::from).collect())
}

/// Encode entries as a contract `RechargeData[]`
pub fn encode(entries: &[RechargeData]) -> Vec<u8> {
    let raw: Vec<ELAMinter::RechargeData> = entries.iter().map(Into::into).collect();
    raw.abi_encode()
}

/// Decode a hex string (with or without `0x`) holding a `RechargeData[]`
pub fn decode_hex(data: &str) -> OracleResult<Vec<RechargeData>> {
    let trimmed = data.trim();
    let stripped = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let raw = hex::decode(stripped)
        .map_err(|e| OracleError::MalformedEncoding(format!("invalid hex: {}", e)))?;
    decode(&raw)
}

/// Call data for `withdraw(string,uint256,uint256)`
pub fn encode_withdraw_call(request: &WithdrawRequest) -> Vec<u8> {
    ELAMinter::withdrawCall {
        _addr: request.side_chain_address.clone(),
        _amount: request.amount,
        _fee: request.fee,
    }
    .abi_encode()
}
