//! Dashboard configuration: contract addresses, token display settings,
//! wallet endpoint and gateway timings, loaded from a JSON file.

use alloy_primitives::{address, Address};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use url::Url;


/// Largest power of ten that fits in a `U256`.
const MAX_DECIMALS: u8 = 77;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ContractAddresses {
    pub token: Address,
    pub sale: Address,
    pub vesting: Address,
    pub router: Address,
    /// Token the price is quoted in, i.e. the second hop of the router path.
    pub quote_token: Address,
}

impl Default for ContractAddresses {
    fn default() -> Self {
        Self {
            token: address!("2f4fb395cf2a622fae074f7018563494072d1d95"),
            sale: address!("dB2D5EaC33846FC5Cf85C3c597C723079C0eB68D"),
            vesting: address!("c126489BA66D7b0Dc06F5a4962778e25d2912Ba4"),
            router: address!("Ad42230785b8f66523Bd1A00967cB289cbb6AeAC"),
            quote_token: address!("bdb64f882e1038168dfdb1d714a6f4061dd6a3f8"),
        }
    }
}

impl ContractAddresses {
    pub fn price_path(&self) -> Vec<Address> {
        vec![self.token, self.quote_token]
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Delay between two `eth_getTransactionReceipt` polls.
    #[serde(with = "humantime_serde")]
    pub receipt_poll_interval: Duration,
    /// Consecutive failed receipt polls after which a write is reported as failed.
    pub max_receipt_poll_failures: u32,
    /// Upper bound on the time spent retrying a read that failed at the transport level.
    #[serde(with = "humantime_serde")]
    pub max_read_elapsed: Duration,
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            receipt_poll_interval: Duration::from_secs(2),
            max_receipt_poll_failures: 10,
            max_read_elapsed: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// JSON-RPC endpoint of the wallet. `None` means no wallet is installed.
    pub wallet_url: Option<Url>,
    pub contracts: ContractAddresses,
    pub token_symbol: String,
    pub token_decimals: u8,
    pub quote_symbol: String,
    pub quote_decimals: u8,
    /// Symbol of the currency attached to `buyTokens`.
    pub base_currency_symbol: String,
    pub gateway: GatewayConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            wallet_url: Url::parse("http://127.0.0.1:8545").ok(),
            contracts: ContractAddresses::default(),
            token_symbol: "IHRAM".to_string(),
            token_decimals: 18,
            quote_symbol: "USDC".to_string(),
            quote_decimals: 18,
            base_currency_symbol: "ETH".to_string(),
            gateway: GatewayConfig::default(),
        }
    }
}

#[derive(Debug, Eq, PartialEq, Error)]
pub enum InvalidConfigError {
    #[error("{0} contract address cannot be the zero address")]
    ZeroContractAddress(&'static str),
    #[error("{field} must be at most 77, got {value}")]
    TooManyDecimals { field: &'static str, value: u8 },
    #[error("receipt_poll_interval must be positive")]
    ZeroPollInterval,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(#[from] InvalidConfigError),
}

impl DashboardConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), InvalidConfigError> {
        let contracts = &self.contracts;
        for (name, address) in [
            ("token", contracts.token),
            ("sale", contracts.sale),
            ("vesting", contracts.vesting),
            ("router", contracts.router),
            ("quote token", contracts.quote_token),
        ] {
            if address == Address::ZERO {
                return Err(InvalidConfigError::ZeroContractAddress(name));
            }
        }
        for (field, value) in [
            ("token_decimals", self.token_decimals),
            ("quote_decimals", self.quote_decimals),
        ] {
            if value > MAX_DECIMALS {
                return Err(InvalidConfigError::TooManyDecimals { field, value });
            }
        }
        if self.gateway.receipt_poll_interval.is_zero() {
            return Err(InvalidConfigError::ZeroPollInterval);
        }
        Ok(())
    }
}
