//! Chain gateway: typed contract reads (`eth_call`) and wallet-signed writes
//! (`eth_sendTransaction` followed by waiting for the receipt).

use crate::config::GatewayConfig;
use crate::eth_rpc::{BlockTag, TransactionReceipt, TransactionRequest, TransactionStatus};
use crate::wallet::{ProviderError, WalletProvider};
use alloy_primitives::{Address, Bytes, B256, U256, U64};
use alloy_sol_types::SolCall;
use backoff::ExponentialBackoffBuilder;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};


const INITIAL_READ_RETRY_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RpcError {
    #[error("network failure: {0}")]
    Transport(String),
    #[error("JSON-RPC error {code}: {message}")]
    JsonRpc { code: i64, message: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl From<ProviderError> for RpcError {
    fn from(error: ProviderError) -> Self {
        match error {
            ProviderError::Transport(message) => RpcError::Transport(message),
            ProviderError::JsonRpc { code, message } => RpcError::JsonRpc { code, message },
            ProviderError::InvalidResponse(message) => RpcError::InvalidResponse(message),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("no wallet is connected")]
    UnavailableProvider,
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error("transaction was rejected in the wallet")]
    TransactionRejected,
    #[error("transaction {transaction_hash} reverted in block {block_number}")]
    TransactionReverted {
        transaction_hash: B256,
        block_number: U64,
    },
}

pub struct ChainGateway {
    provider: Option<Arc<dyn WalletProvider>>,
    config: GatewayConfig,
}

impl ChainGateway {
    pub fn new(provider: Arc<dyn WalletProvider>, config: GatewayConfig) -> Self {
        Self {
            provider: Some(provider),
            config,
        }
    }

    /// A gateway without a wallet behind it: every call fails with
    /// [`GatewayError::UnavailableProvider`].
    pub fn unavailable(config: GatewayConfig) -> Self {
        Self {
            provider: None,
            config,
        }
    }

    fn provider(&self) -> Result<&dyn WalletProvider, GatewayError> {
        self.provider
            .as_deref()
            .ok_or(GatewayError::UnavailableProvider)
    }

    /// Executes a view function. Transport failures are retried with an
    /// exponential backoff; a JSON-RPC error (e.g. a revert) is returned as is.
    pub async fn read_call<C>(&self, to: Address, call: &C) -> Result<C::Return, GatewayError>
    where
        C: SolCall + Sync,
    {
        let provider = self.provider()?;
        let request = TransactionRequest {
            from: None,
            to,
            data: Bytes::from(call.abi_encode()),
            value: None,
        };
        let params = to_params((request, BlockTag::Latest))?;
        let result = self.request_with_retry(provider, "eth_call", params).await?;
        let data: Bytes = from_result(result)?;
        C::abi_decode_returns(&data, true).map_err(|e| {
            GatewayError::Rpc(RpcError::InvalidResponse(format!(
                "failed to decode result of {}: {e}",
                C::SIGNATURE
            )))
        })
    }

    /// Submits a state-changing call and waits until it is mined.
    ///
    /// Only a receipt with a successful status is returned as `Ok`. The write
    /// is never resubmitted.
    pub async fn write_call<C>(
        &self,
        from: Address,
        to: Address,
        call: &C,
        value: U256,
    ) -> Result<TransactionReceipt, GatewayError>
    where
        C: SolCall + Sync,
    {
        let provider = self.provider()?;
        let request = TransactionRequest {
            from: Some(from),
            to,
            data: Bytes::from(call.abi_encode()),
            value: (!value.is_zero()).then_some(value),
        };
        let params = to_params([request])?;
        let result = provider
            .request("eth_sendTransaction", params)
            .await
            .map_err(|e| {
                if e.is_user_rejection() {
                    GatewayError::TransactionRejected
                } else {
                    GatewayError::Rpc(e.into())
                }
            })?;
        let transaction_hash: B256 = from_result(result)?;
        info!(
            "Submitted {} to {to} from {from}: {transaction_hash}",
            C::SIGNATURE
        );

        let receipt = self.wait_for_receipt(provider, transaction_hash).await?;
        match receipt.status {
            TransactionStatus::Success => {
                info!(
                    "Confirmed {transaction_hash} in block {}",
                    receipt.block_number
                );
                Ok(receipt)
            }
            TransactionStatus::Failure => Err(GatewayError::TransactionReverted {
                transaction_hash,
                block_number: receipt.block_number,
            }),
        }
    }

    async fn wait_for_receipt(
        &self,
        provider: &dyn WalletProvider,
        transaction_hash: B256,
    ) -> Result<TransactionReceipt, GatewayError> {
        let params = to_params([transaction_hash])?;
        let mut consecutive_failures = 0_u32;
        loop {
            match provider
                .request("eth_getTransactionReceipt", params.clone())
                .await
            {
                Ok(Value::Null) => {
                    debug!("Transaction {transaction_hash} not mined yet");
                    consecutive_failures = 0;
                }
                Ok(value) => return Ok(from_result(value)?),
                Err(e) => {
                    consecutive_failures += 1;
                    warn!(
                        "Failed to fetch receipt of {transaction_hash} ({consecutive_failures}/{}): {e}",
                        self.config.max_receipt_poll_failures
                    );
                    if consecutive_failures >= self.config.max_receipt_poll_failures {
                        return Err(GatewayError::Rpc(e.into()));
                    }
                }
            }
            tokio::time::sleep(self.config.receipt_poll_interval).await;
        }
    }

    async fn request_with_retry(
        &self,
        provider: &dyn WalletProvider,
        method: &str,
        params: Value,
    ) -> Result<Value, RpcError> {
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(INITIAL_READ_RETRY_INTERVAL)
            .with_max_elapsed_time(Some(self.config.max_read_elapsed))
            .build();
        backoff::future::retry(policy, || {
            let params = params.clone();
            async move {
                provider.request(method, params).await.map_err(|e| {
                    if e.is_transport() {
                        warn!("Retrying {method} after transport failure: {e}");
                        backoff::Error::transient(e)
                    } else {
                        backoff::Error::permanent(e)
                    }
                })
            }
        })
        .await
        .map_err(RpcError::from)
    }
}

fn to_params<T: Serialize>(params: T) -> Result<Value, RpcError> {
    serde_json::to_value(params)
        .map_err(|e| RpcError::InvalidResponse(format!("failed to encode request: {e}")))
}

fn from_result<T: DeserializeOwned>(result: Value) -> Result<T, RpcError> {
    serde_json::from_value(result)
        .map_err(|e| RpcError::InvalidResponse(format!("unexpected result: {e}")))
}
