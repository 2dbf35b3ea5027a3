use ethers::types::U256;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Renders a base-unit amount as a decimal for display.
pub fn u256_to_decimal(value: U256, decimals: u8) -> Result<Decimal, ConversionError> {
    let value_str = value.to_string();
    let mut decimal_value = Decimal::from_str(&value_str)
        .map_err(|e| ConversionError::InvalidDecimal(e.to_string()))?;

    decimal_value
        .set_scale(decimals as u32)
        .map_err(|_| ConversionError::Overflow)?;
    Ok(decimal_value.normalize())
}

/// Scales a user-entered amount into base units, truncating digits beyond `decimals`.
pub fn decimal_to_u256(amount: Decimal, decimals: u8) -> Result<U256, ConversionError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(ConversionError::Negative);
    }
    let truncated = amount.round_dp_with_strategy(decimals as u32, RoundingStrategy::ToZero);
    let mantissa = truncated
        .mantissa()
        .to_u128()
        .ok_or(ConversionError::Overflow)?;
    let missing_scale = (decimals as u32).saturating_sub(truncated.scale());
    U256::from(mantissa)
        .checked_mul(U256::exp10(missing_scale as usize))
        .ok_or(ConversionError::Overflow)
}

/// Display helper that never fails.
///
/// Amounts beyond `Decimal`'s 96-bit mantissa are scaled on their digit string instead.
pub fn format_amount(value: U256, decimals: u8) -> String {
    match u256_to_decimal(value, decimals) {
        Ok(d) => d.to_string(),
        Err(_) => scale_digits(&value.to_string(), decimals as usize),
    }
}

fn scale_digits(digits: &str, decimals: usize) -> String {
    if decimals == 0 {
        return digits.to_string();
    }
    let padded = format!("{:0>width$}", digits, width = decimals + 1);
    let (whole, fraction) = padded.split_at(padded.len() - decimals);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{}.{}", whole, fraction)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("Invalid decimal: {0}")]
    InvalidDecimal(String),
    #[error("Overflow in conversion")]
    Overflow,
    #[error("Negative amount")]
    Negative,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_scaling() {
        let one_and_half = Decimal::from_str("1.5").unwrap();
        let raw = decimal_to_u256(one_and_half, 18).unwrap();
        assert_eq!(raw, U256::from(1_500_000_000_000_000_000u128));
        assert_eq!(u256_to_decimal(raw, 18).unwrap(), one_and_half);
    }

    #[test]
    fn test_excess_precision_is_truncated() {
        let amount = Decimal::from_str("1.2345678").unwrap();
        assert_eq!(decimal_to_u256(amount, 6).unwrap(), U256::from(1_234_567u64));
    }

    #[test]
    fn test_format_amount_beyond_decimal_range() {
        assert_eq!(format_amount(U256::exp10(29), 18), "100000000000");
        assert_eq!(format_amount(U256::exp10(29) + U256::exp10(17), 18), "100000000000.1");
        assert_eq!(format_amount(U256::from(5), 30), "0.000000000000000000000000000005");
        assert_eq!(format_amount(U256::from(2_500_000u64), 6), "2.5");
    }

    #[test]
    fn test_zero_decimals_for_collection_counts() {
        assert_eq!(u256_to_decimal(U256::from(3), 0).unwrap(), Decimal::from(3));
        assert!(decimal_to_u256(Decimal::from(-1), 0).is_err());
    }
}
