//! The wallet injection interface: an EIP-1193 style `request(method, params)`
//! entry point. Every transaction is signed by the wallet behind it.

use crate::eth_rpc::{JsonRpcReply, JsonRpcRequest, JsonRpcResult, USER_REJECTED_REQUEST};
use async_trait::async_trait;
use mockall::automock;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;


#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("wallet endpoint unreachable: {0}")]
    Transport(String),
    #[error("JSON-RPC error {code}: {message}")]
    JsonRpc { code: i64, message: String },
    #[error("invalid response from wallet: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    pub fn is_user_rejection(&self) -> bool {
        matches!(self, ProviderError::JsonRpc { code, .. } if *code == USER_REJECTED_REQUEST)
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, ProviderError::Transport(_))
    }
}

/// A trait defining the request interface a wallet exposes.
#[automock]
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Sends a single JSON-RPC request and returns its `result`.
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError>;
}

/// A wallet reached over JSON-RPC on HTTP.
pub struct JsonRpcWallet {
    url: Url,
    http_client: reqwest::Client,
    /// Used to correlate request and response in logs.
    request_counter: AtomicU64,
}

impl JsonRpcWallet {
    pub fn new(url: Url, timeout: Duration) -> Result<Self, ProviderError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Transport(format!("failed to build http client: {e}")))?;
        Ok(Self::with_client(url, http_client))
    }

    pub fn with_client(url: Url, http_client: reqwest::Client) -> Self {
        Self {
            url,
            http_client,
            request_counter: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl WalletProvider for JsonRpcWallet {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        let id = self.request_counter.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest::new(id, method, &params);
        debug!("[{id}] >> {method} {params}");

        let response = self
            .http_client
            .post(self.url.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Transport(format!(
                "HTTP status {status} from {}",
                self.url
            )));
        }
        let reply: JsonRpcReply = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        if let Some(reply_id) = reply.id {
            if reply_id != id {
                return Err(ProviderError::InvalidResponse(format!(
                    "expected response id {id}, got {reply_id}"
                )));
            }
        }

        match reply.into_result() {
            JsonRpcResult::Result(value) => {
                debug!("[{id}] << {method} {value}");
                Ok(value)
            }
            JsonRpcResult::Error { code, message } => {
                debug!("[{id}] << {method} error {code}: {message}");
                Err(ProviderError::JsonRpc { code, message })
            }
        }
    }
}
