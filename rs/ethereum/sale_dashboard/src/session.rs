//! The connected account and its role on the Sale contract.

use crate::contracts::SaleContract;
use crate::gateway::{GatewayError, RpcError};
use crate::wallet::{ProviderError, WalletProvider};
use alloy_primitives::Address;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};


#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Account {
    pub address: Address,
    /// Whether `address` owns the Sale contract. `None` until checked.
    pub is_owner: Option<bool>,
}

impl Account {
    fn new(address: Address) -> Self {
        Self {
            address,
            is_owner: None,
        }
    }

    pub fn is_known_owner(&self) -> bool {
        self.is_owner == Some(true)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("no wallet available: {0}")]
    WalletUnavailable(String),
    #[error("connection request was rejected in the wallet")]
    UserRejected,
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error("no account is connected")]
    NotConnected,
    #[error("failed to check ownership: {0}")]
    Ownership(#[from] GatewayError),
}

#[derive(Default)]
struct SessionState {
    account: Option<Account>,
    /// Bumped on every connect and disconnect so that an ownership check
    /// started for a previous session is not applied to the current one.
    epoch: u64,
}

pub struct AccountSession {
    provider: Option<Arc<dyn WalletProvider>>,
    state: RwLock<SessionState>,
}

impl AccountSession {
    pub fn new(provider: Option<Arc<dyn WalletProvider>>) -> Self {
        Self {
            provider,
            state: RwLock::new(SessionState::default()),
        }
    }

    pub fn account(&self) -> Option<Account> {
        self.state.read().account.clone()
    }

    pub fn address(&self) -> Option<Address> {
        self.state.read().account.as_ref().map(|account| account.address)
    }

    /// Requests the wallet's accounts and starts a new session with the first
    /// one. The previous session ends before the request is sent, so a failed
    /// connect leaves no account behind. Any role previously derived is
    /// discarded, even if the wallet returns the same address again.
    pub async fn connect(&self) -> Result<Account, SessionError> {
        let provider = self
            .provider
            .as_ref()
            .ok_or_else(|| SessionError::WalletUnavailable("no wallet configured".to_string()))?;
        self.disconnect();
        let result = provider
            .request("eth_requestAccounts", serde_json::json!([]))
            .await
            .map_err(|e| match e {
                e if e.is_user_rejection() => SessionError::UserRejected,
                ProviderError::Transport(message) => SessionError::WalletUnavailable(message),
                e => SessionError::Rpc(e.into()),
            })?;
        let accounts: Vec<Address> = serde_json::from_value(result).map_err(|e| {
            SessionError::Rpc(RpcError::InvalidResponse(format!(
                "unexpected eth_requestAccounts result: {e}"
            )))
        })?;
        let address = accounts.first().copied().ok_or(SessionError::UserRejected)?;

        let account = Account::new(address);
        let mut state = self.state.write();
        state.epoch += 1;
        state.account = Some(account.clone());
        info!("Connected account {address}");
        Ok(account)
    }

    /// Reads the Sale contract owner and records whether the connected
    /// account is that owner.
    pub async fn refresh_ownership(&self, sale: &dyn SaleContract) -> Result<bool, SessionError> {
        let (address, epoch) = {
            let state = self.state.read();
            let account = state.account.as_ref().ok_or(SessionError::NotConnected)?;
            (account.address, state.epoch)
        };
        let owner = sale.owner().await?;
        let is_owner = owner == address;

        let mut guard = self.state.write();
        let state = &mut *guard;
        match state.account.as_mut() {
            Some(account) if state.epoch == epoch => {
                if account.is_owner != Some(is_owner) {
                    info!("Account {address} is owner of the sale contract: {is_owner}");
                }
                account.is_owner = Some(is_owner);
            }
            _ => debug!("Discarding ownership of {address} checked for a previous session"),
        }
        Ok(is_owner)
    }

    pub fn disconnect(&self) {
        let mut state = self.state.write();
        state.epoch += 1;
        if let Some(account) = state.account.take() {
            info!("Disconnected account {}", account.address);
        }
    }
}
