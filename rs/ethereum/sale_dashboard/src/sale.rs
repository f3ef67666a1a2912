//! State of the current sale round and the calls that change it.
//!
//! Rounds are never mutated client-side: every view of a round is the result
//! of a fresh [`fetch_current_round`], and every change goes through a
//! wallet-signed transaction on the Sale contract.

use crate::contracts::SaleContract;
use crate::eth_rpc::TransactionReceipt;
use crate::gateway::GatewayError;
use crate::validation::{
    parse_address, parse_base_amount, parse_non_negative_integer, ValidationError,
};
use alloy_primitives::{Address, U256};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};


/// The round returned by `getCurrentRound()`. Amounts are in the smallest
/// denomination of the base currency.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SaleRound {
    pub round_id: U256,
    pub active: bool,
    /// Tokens per unit of base currency.
    pub rate: U256,
    pub min_contribution: U256,
    pub max_contribution: U256,
    pub cap: U256,
    pub raised: U256,
    pub vesting_address: Address,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundAnomaly {
    RaisedAboveCap,
    MinAboveMax,
}

impl SaleRound {
    /// Relations the Sale contract is expected to maintain but that this
    /// round does not satisfy.
    pub fn anomalies(&self) -> Vec<RoundAnomaly> {
        let mut anomalies = Vec::new();
        if self.raised > self.cap {
            anomalies.push(RoundAnomaly::RaisedAboveCap);
        }
        if self.min_contribution > self.max_contribution {
            anomalies.push(RoundAnomaly::MinAboveMax);
        }
        anomalies
    }

    /// Amount of base currency the round can still accept.
    pub fn remaining(&self) -> U256 {
        self.cap.saturating_sub(self.raised)
    }
}

/// Arguments of `configureRound`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoundParams {
    pub round_id: U256,
    pub rate: U256,
    pub min_contribution: U256,
    pub max_contribution: U256,
    pub cap: U256,
    pub vesting_address: Address,
}

impl RoundParams {
    /// Shape-checks raw user input. Numbers must be non-negative base-10
    /// integers and the vesting address a well-formed `0x` address; any
    /// further consistency check is left to the contract.
    pub fn parse(
        round_id: &str,
        rate: &str,
        min_contribution: &str,
        max_contribution: &str,
        cap: &str,
        vesting_address: &str,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            round_id: parse_non_negative_integer("round id", round_id)?,
            rate: parse_non_negative_integer("rate", rate)?,
            min_contribution: parse_non_negative_integer("min contribution", min_contribution)?,
            max_contribution: parse_non_negative_integer("max contribution", max_contribution)?,
            cap: parse_non_negative_integer("cap", cap)?,
            vesting_address: parse_address("vesting address", vesting_address)?,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SaleError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

pub async fn fetch_current_round(sale: &dyn SaleContract) -> Result<SaleRound, GatewayError> {
    let round = sale.current_round().await?;
    for anomaly in round.anomalies() {
        warn!(
            "Sale contract {} reported an inconsistent round {}: {anomaly:?}",
            sale.address(),
            round.round_id
        );
    }
    Ok(round)
}

/// Purchases are only offered against a round that is known to be active.
/// An unknown round (e.g. because the last fetch failed) is not treated as
/// inactive but still disables purchases.
pub fn purchase_permitted(round: Option<&SaleRound>) -> bool {
    round.is_some_and(|round| round.active)
}

/// Buys tokens for `amount` units of the base currency, e.g. `"0.05"`.
///
/// The amount is validated before anything is sent. Contribution limits and
/// the cap are enforced by the contract only.
pub async fn buy(
    sale: &dyn SaleContract,
    from: Address,
    amount: &str,
) -> Result<TransactionReceipt, SaleError> {
    let value = parse_base_amount(amount)?;
    info!("Buying tokens from {} for {value} wei", sale.address());
    Ok(sale.buy_tokens(from, value).await?)
}

pub async fn configure_round(
    sale: &dyn SaleContract,
    from: Address,
    params: RoundParams,
) -> Result<TransactionReceipt, SaleError> {
    info!("Configuring round {} on {}", params.round_id, sale.address());
    Ok(sale.configure_round(from, params).await?)
}

pub async fn activate_round(
    sale: &dyn SaleContract,
    from: Address,
    round_id: &str,
) -> Result<TransactionReceipt, SaleError> {
    let round_id = parse_non_negative_integer("round id", round_id)?;
    info!("Activating round {round_id} on {}", sale.address());
    Ok(sale.activate_round(from, round_id).await?)
}

pub async fn update_rate(
    sale: &dyn SaleContract,
    from: Address,
    rate: &str,
) -> Result<TransactionReceipt, SaleError> {
    let rate = parse_non_negative_integer("rate", rate)?;
    info!("Updating rate to {rate} on {}", sale.address());
    Ok(sale.update_rate(from, rate).await?)
}

pub async fn toggle_sale(
    sale: &dyn SaleContract,
    from: Address,
) -> Result<TransactionReceipt, SaleError> {
    info!("Toggling sale on {}", sale.address());
    Ok(sale.toggle_sale(from).await?)
}

pub async fn withdraw_unsold_tokens(
    sale: &dyn SaleContract,
    from: Address,
) -> Result<TransactionReceipt, SaleError> {
    info!("Withdrawing unsold tokens from {}", sale.address());
    Ok(sale.withdraw_unsold_tokens(from).await?)
}
