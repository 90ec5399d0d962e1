// Formatting helpers for human readable transaction descriptions

use alloy_primitives::utils::{format_units, UnitsError};
use alloy_primitives::U256;

/// Format a fixed point token amount, e.g. `1234500000000000000000` with 18
/// decimals and precision 2 becomes `1,234.50`. Digits past `precision` are
/// truncated. Fails when `decimals` is not a valid unit.
pub fn format_fixed(amount: U256, decimals: u8, precision: usize) -> Result<String, UnitsError> {
    let formatted = format_units(amount, decimals)?;
    let (whole, fraction) = formatted.split_once('.').unwrap_or((formatted.as_str(), ""));

    let whole = group_thousands(whole);
    if decimals == 0 || precision == 0 {
        return Ok(whole);
    }

    let fraction = &fraction[..precision.min(fraction.len())];
    Ok(format!("{}.{}", whole, fraction))
}

/// Format an 18-decimal fee fraction as a percentage, e.g. `10^16` -> `1.00%`
pub fn format_pct(pct: u64) -> Result<String, UnitsError> {
    let percent = U256::from(pct) * U256::from(100u64);
    Ok(format!("{}%", format_fixed(percent, 18, 2)?))
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_fixed() {
        let amount = U256::from(1_234_500_000_000_000_000_000u128);
        assert_eq!(format_fixed(amount, 18, 2).unwrap(), "1,234.50");
        assert_eq!(format_fixed(U256::from(5u64), 6, 4).unwrap(), "0.0000");
        assert_eq!(format_fixed(U256::from(1_000_000u64), 0, 2).unwrap(), "1,000,000");
        assert_eq!(format_fixed(U256::from(999u64), 0, 2).unwrap(), "999");
        assert_eq!(format_fixed(U256::from(15u64), 1, 4).unwrap(), "1.5");
    }

    #[test]
    fn test_format_fixed_rejects_invalid_decimals() {
        assert!(matches!(format_fixed(U256::from(1u64), 78, 2), Err(UnitsError::InvalidUnit(_))));
    }

    #[test]
    fn test_format_pct() {
        assert_eq!(format_pct(10_000_000_000_000_000).unwrap(), "1.00%");
        assert_eq!(format_pct(5_000_000_000_000_000).unwrap(), "0.50%");
        assert_eq!(format_pct(123_400_000_000_000_000).unwrap(), "12.34%");
        assert_eq!(format_pct(0).unwrap(), "0.00%");
    }
}
