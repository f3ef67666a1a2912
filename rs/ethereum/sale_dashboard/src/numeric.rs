//! Conversion of integer token amounts to human-readable decimal strings.

use alloy_primitives::utils::{format_units, UnitsError};
use alloy_primitives::U256;


/// Number of fraction digits of the base currency attached to `buyTokens`.
pub const BASE_CURRENCY_DECIMALS: u8 = 18;

/// Formats `amount`, expressed in the smallest denomination of a token with
/// `decimals` fraction digits, as a decimal string without trailing zeros.
///
/// ```
/// use alloy_primitives::U256;
/// use ic_sale_dashboard::numeric::format_amount;
///
/// let amount = U256::from(1_500_000_000_000_000_000_u128);
/// assert_eq!(format_amount(amount, 18).unwrap(), "1.5");
/// ```
pub fn format_amount(amount: U256, decimals: u8) -> Result<String, UnitsError> {
    let formatted = format_units(amount, decimals)?;
    Ok(trim_fraction(formatted))
}

fn trim_fraction(formatted: String) -> String {
    match formatted.split_once('.') {
        Some((integer, fraction)) => {
            let fraction = fraction.trim_end_matches('0');
            if fraction.is_empty() {
                integer.to_string()
            } else {
                format!("{integer}.{fraction}")
            }
        }
        None => formatted,
    }
}

/// `10^decimals`, i.e. one whole token in its smallest denomination.
pub fn one_token(decimals: u8) -> U256 {
    U256::from(10_u8).pow(U256::from(decimals))
}
