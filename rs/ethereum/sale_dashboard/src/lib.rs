//! Client for an EVM token sale: price quotes, purchases, a vesting schedule
//! and owner administration, merged into a single view model.
//!
//! All state lives in external contracts. This crate only reads it through a
//! wallet-supplied JSON-RPC provider, submits wallet-signed transactions and
//! keeps the [`dashboard::Dashboard`] view model consistent with what the
//! contracts report.

pub mod config;
pub mod contracts;
pub mod dashboard;
pub mod eth_rpc;
pub mod gateway;
pub mod guard;
pub mod logs;
pub mod numeric;
pub mod sale;
pub mod session;
pub mod validation;
pub mod vesting;
pub mod wallet;

#[cfg(test)]
mod test_fixtures;

/// Placeholder rendered for any field whose value is not known.
pub const UNKNOWN_PLACEHOLDER: &str = "...";
