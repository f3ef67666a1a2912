//! Client-side shape checks on user input. These never replace the checks
//! performed by the contracts.

use crate::numeric::BASE_CURRENCY_DECIMALS;
use alloy_primitives::utils::parse_units;
use alloy_primitives::{Address, U256};
use std::str::FromStr;
use thiserror::Error;


#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is empty")]
    Empty { field: &'static str },
    #[error("{field} is not a non-negative number: {value:?}")]
    NotANumber { field: &'static str, value: String },
    #[error("{field} has more than {max} fraction digits: {value:?}")]
    TooManyFractionDigits {
        field: &'static str,
        value: String,
        max: u8,
    },
    #[error("{field} must be positive")]
    NotPositive { field: &'static str },
    #[error("{field} does not fit in 256 bits: {value:?}")]
    Overflow { field: &'static str, value: String },
    #[error("{field} is not a valid address: {value:?}")]
    InvalidAddress { field: &'static str, value: String },
}

/// Parses a purchase amount expressed in the base currency (e.g. `"0.01"`)
/// into its smallest denomination.
pub fn parse_base_amount(value: &str) -> Result<U256, ValidationError> {
    const FIELD: &str = "amount";
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Empty { field: FIELD });
    }
    let not_a_number = || ValidationError::NotANumber {
        field: FIELD,
        value: value.to_string(),
    };
    let (integer, fraction) = match value.split_once('.') {
        Some((integer, fraction)) => (integer, fraction),
        None => (value, ""),
    };
    if integer.is_empty() && fraction.is_empty() {
        return Err(not_a_number());
    }
    if !is_ascii_digits(integer) || !is_ascii_digits(fraction) {
        return Err(not_a_number());
    }
    if fraction.len() > BASE_CURRENCY_DECIMALS as usize {
        return Err(ValidationError::TooManyFractionDigits {
            field: FIELD,
            value: value.to_string(),
            max: BASE_CURRENCY_DECIMALS,
        });
    }
    let normalized = format!(
        "{}.{}",
        if integer.is_empty() { "0" } else { integer },
        if fraction.is_empty() { "0" } else { fraction },
    );
    let amount = parse_units(&normalized, BASE_CURRENCY_DECIMALS)
        .map_err(|_| ValidationError::Overflow {
            field: FIELD,
            value: value.to_string(),
        })?
        .get_absolute();
    if amount.is_zero() {
        return Err(ValidationError::NotPositive { field: FIELD });
    }
    Ok(amount)
}

/// Parses a non-negative base-10 integer such as a round id or a rate.
pub fn parse_non_negative_integer(
    field: &'static str,
    value: &str,
) -> Result<U256, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    if !is_ascii_digits(value) {
        return Err(ValidationError::NotANumber {
            field,
            value: value.to_string(),
        });
    }
    U256::from_str_radix(value, 10).map_err(|_| ValidationError::Overflow {
        field,
        value: value.to_string(),
    })
}

/// Parses a `0x`-prefixed 20-byte address. The checksum casing is not
/// enforced.
pub fn parse_address(field: &'static str, value: &str) -> Result<Address, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    let invalid = || ValidationError::InvalidAddress {
        field,
        value: value.to_string(),
    };
    if !value.starts_with("0x") || value.len() != 42 {
        return Err(invalid());
    }
    Address::from_str(value).map_err(|_| invalid())
}

fn is_ascii_digits(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit())
}
