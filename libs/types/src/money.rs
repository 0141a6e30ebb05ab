//! Money field decoding
//!
//! Costs and amounts are never negative. A negative value in an upstream
//! document fails decoding of that document.

use rust_decimal::Decimal;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

/// Deserialize a `Decimal` that must be zero or greater.
pub fn non_negative<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let value = <Decimal as Deserialize>::deserialize(deserializer)?;
    if value.is_sign_negative() && !value.is_zero() {
        return Err(D::Error::custom(format!(
            "expected a non-negative amount, got {value}"
        )));
    }
    Ok(value)
}
