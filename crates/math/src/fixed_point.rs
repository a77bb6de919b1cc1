/// PRECISION-scaled fractions and unit conversions
///
/// Fractions are dimensionless values scaled by `PRECISION` (1.0 == 10^18).
/// Every cross-unit conversion goes through one of these helpers so scale
/// factors are never mixed implicitly. All helpers round down.

use crate::big_int::{mul_div, Rounding};
use crate::constants::{BPS_DENOMINATOR, ORACLE_SCALE, PRECISION};
use crate::error::{MathError, MathResult};

// ============================================================================
// Fraction Construction
// ============================================================================

/// Convert basis points to a PRECISION-scaled fraction
pub fn fraction_from_bps(bps: u32) -> u128 {
    bps as u128 * PRECISION / BPS_DENOMINATOR
}

/// `numerator / denominator` as a PRECISION-scaled fraction
pub fn ratio(numerator: u128, denominator: u128) -> MathResult<u128> {
    mul_div(numerator, PRECISION, denominator, Rounding::Down)
}

/// `1 - fraction`, saturating at zero
pub fn complement(fraction: u128) -> u128 {
    PRECISION.saturating_sub(fraction)
}

// ============================================================================
// Fraction Application
// ============================================================================

/// `amount * fraction / PRECISION`
pub fn mul_fraction(amount: u128, fraction: u128) -> MathResult<u128> {
    mul_div(amount, fraction, PRECISION, Rounding::Down)
}

/// `amount * PRECISION / fraction`
pub fn div_fraction(amount: u128, fraction: u128) -> MathResult<u128> {
    if fraction == 0 {
        return Err(MathError::DivisionByZero);
    }
    mul_div(amount, PRECISION, fraction, Rounding::Down)
}

/// Convert an 8-decimal oracle answer to a PRECISION-scaled price
pub fn oracle_to_precision(answer: u128) -> MathResult<u128> {
    mul_div(answer, PRECISION, ORACLE_SCALE, Rounding::Down)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fraction_from_bps() {
        assert_eq!(fraction_from_bps(10_000), PRECISION);
        assert_eq!(fraction_from_bps(1_000), PRECISION / 10);
        assert_eq!(fraction_from_bps(1), PRECISION / 10_000);
    }

    #[test]
    fn test_fee_rounding_is_floor() {
        // 1% of 99 units is 0.99 units, charged as zero
        assert_eq!(mul_fraction(99, fraction_from_bps(100)).unwrap(), 0);
        assert_eq!(mul_fraction(100, fraction_from_bps(100)).unwrap(), 1);
    }

    #[test]
    fn test_ratio_and_complement() {
        assert_eq!(ratio(1, 4).unwrap(), PRECISION / 4);
        assert_eq!(complement(PRECISION / 4), PRECISION * 3 / 4);
        assert_eq!(complement(PRECISION * 2), 0);
    }

    #[test]
    fn test_div_fraction() {
        assert_eq!(div_fraction(50, PRECISION / 2).unwrap(), 100);
        assert_eq!(div_fraction(50, 0), Err(MathError::DivisionByZero));
    }

    #[test]
    fn test_oracle_to_precision() {
        assert_eq!(oracle_to_precision(200_000_000).unwrap(), 2 * PRECISION);
        assert_eq!(oracle_to_precision(1).unwrap(), PRECISION / ORACLE_SCALE);
    }
}
