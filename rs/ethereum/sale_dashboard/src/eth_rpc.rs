//! This module contains definitions for communicating with an Ethereum wallet using the
//! [JSON RPC](https://ethereum.org/en/developers/docs/apis/json-rpc/) interface.

use alloy_primitives::{Address, Bytes, B256, U256, U64};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{Display, Formatter};


/// EIP-1193 error code for a request the user declined in the wallet.
pub const USER_REJECTED_REQUEST: i64 = 4001;

pub const JSON_RPC_VERSION: &str = "2.0";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct JsonRpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub method: &'a str,
    pub params: &'a Value,
    pub id: u64,
}

impl<'a> JsonRpcRequest<'a> {
    pub fn new(id: u64, method: &'a str, params: &'a Value) -> Self {
        Self {
            jsonrpc: JSON_RPC_VERSION,
            method,
            params,
            id,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

/// Reply envelope. A `null` result is a valid result (e.g. a receipt for a
/// transaction that is not mined yet), so it is kept as [`Value::Null`].
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct JsonRpcReply {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JsonRpcResult<T> {
    Result(T),
    Error { code: i64, message: String },
}

impl JsonRpcReply {
    pub fn into_result(self) -> JsonRpcResult<Value> {
        match self.error {
            Some(JsonRpcError { code, message }) => JsonRpcResult::Error { code, message },
            None => JsonRpcResult::Result(self.result),
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockTag {
    #[default]
    Latest,
}

/// Transaction object shared by `eth_call` and `eth_sendTransaction`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    pub to: Address,
    pub data: Bytes,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "U64", into = "U64")]
pub enum TransactionStatus {
    /// Transaction was mined but execution failed (e.g., out-of-gas, require).
    Failure,
    /// Transaction was mined and executed successfully.
    Success,
}

impl TryFrom<U64> for TransactionStatus {
    type Error = String;

    fn try_from(value: U64) -> Result<Self, Self::Error> {
        match value.to::<u64>() {
            0 => Ok(TransactionStatus::Failure),
            1 => Ok(TransactionStatus::Success),
            _ => Err(format!("invalid transaction status: {}", value)),
        }
    }
}

impl From<TransactionStatus> for U64 {
    fn from(value: TransactionStatus) -> Self {
        match value {
            TransactionStatus::Failure => U64::from(0_u8),
            TransactionStatus::Success => U64::from(1_u8),
        }
    }
}

impl Display for TransactionStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionStatus::Failure => write!(f, "Failure"),
            TransactionStatus::Success => write!(f, "Success"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: B256,
    pub block_number: U64,
    pub gas_used: U256,
    pub status: TransactionStatus,
}
