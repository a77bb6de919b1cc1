//! # Liquidity Math
//!
//! Concentrated-liquidity formulas over Q64.64 square-root prices:
//! liquidity obtainable from token amounts, token amounts backing a
//! liquidity amount, and the price ratio implied by a sqrt price.

use ethnum::U256;

use crate::big_int::{mul_div, narrow, Rounding};
use crate::constants::{PRECISION, Q64};
use crate::error::{MathError, MathResult};

fn sorted(a: u128, b: u128) -> (u128, u128) {
    if a > b {
        (b, a)
    } else {
        (a, b)
    }
}

// ============================================================================
// Amount Deltas
// ============================================================================

/// Amount of token0 between two sqrt prices for `liquidity`
pub fn get_amount_0_delta(
    sqrt_ratio_a_x64: u128,
    sqrt_ratio_b_x64: u128,
    liquidity: u128,
    round_up: bool,
) -> MathResult<u128> {
    let (sqrt_ratio_a_x64, sqrt_ratio_b_x64) = sorted(sqrt_ratio_a_x64, sqrt_ratio_b_x64);
    if sqrt_ratio_a_x64 == 0 {
        return Err(MathError::DivisionByZero);
    }
    let rounding = if round_up { Rounding::Up } else { Rounding::Down };

    // L * (sb - sa) / sb * 2^64 / sa
    let scaled = mul_div(
        liquidity,
        sqrt_ratio_b_x64 - sqrt_ratio_a_x64,
        sqrt_ratio_b_x64,
        rounding,
    )?;
    mul_div(scaled, Q64, sqrt_ratio_a_x64, rounding)
}

/// Amount of token1 between two sqrt prices for `liquidity`
pub fn get_amount_1_delta(
    sqrt_ratio_a_x64: u128,
    sqrt_ratio_b_x64: u128,
    liquidity: u128,
    round_up: bool,
) -> MathResult<u128> {
    let (sqrt_ratio_a_x64, sqrt_ratio_b_x64) = sorted(sqrt_ratio_a_x64, sqrt_ratio_b_x64);
    let rounding = if round_up { Rounding::Up } else { Rounding::Down };
    mul_div(liquidity, sqrt_ratio_b_x64 - sqrt_ratio_a_x64, Q64, rounding)
}

// ============================================================================
// Liquidity From Amounts
// ============================================================================

/// Calculate liquidity for a given amount of token0
pub fn get_liquidity_for_amount_0(
    sqrt_ratio_a_x64: u128,
    sqrt_ratio_b_x64: u128,
    amount0: u128,
) -> MathResult<u128> {
    let (sqrt_ratio_a_x64, sqrt_ratio_b_x64) = sorted(sqrt_ratio_a_x64, sqrt_ratio_b_x64);
    if sqrt_ratio_a_x64 == sqrt_ratio_b_x64 {
        return Err(MathError::InvalidPriceRange);
    }

    let intermediate = mul_div(sqrt_ratio_a_x64, sqrt_ratio_b_x64, Q64, Rounding::Down)?;
    mul_div(
        amount0,
        intermediate,
        sqrt_ratio_b_x64 - sqrt_ratio_a_x64,
        Rounding::Down,
    )
}

/// Calculate liquidity for a given amount of token1
pub fn get_liquidity_for_amount_1(
    sqrt_ratio_a_x64: u128,
    sqrt_ratio_b_x64: u128,
    amount1: u128,
) -> MathResult<u128> {
    let (sqrt_ratio_a_x64, sqrt_ratio_b_x64) = sorted(sqrt_ratio_a_x64, sqrt_ratio_b_x64);
    if sqrt_ratio_a_x64 == sqrt_ratio_b_x64 {
        return Err(MathError::InvalidPriceRange);
    }

    mul_div(amount1, Q64, sqrt_ratio_b_x64 - sqrt_ratio_a_x64, Rounding::Down)
}

/// Maximum liquidity mintable from both amounts at the current price
pub fn get_liquidity_for_amounts(
    sqrt_price_x64: u128,
    sqrt_ratio_a_x64: u128,
    sqrt_ratio_b_x64: u128,
    amount0: u128,
    amount1: u128,
) -> MathResult<u128> {
    let (sqrt_ratio_a_x64, sqrt_ratio_b_x64) = sorted(sqrt_ratio_a_x64, sqrt_ratio_b_x64);

    if sqrt_price_x64 <= sqrt_ratio_a_x64 {
        get_liquidity_for_amount_0(sqrt_ratio_a_x64, sqrt_ratio_b_x64, amount0)
    } else if sqrt_price_x64 < sqrt_ratio_b_x64 {
        let liquidity0 = get_liquidity_for_amount_0(sqrt_price_x64, sqrt_ratio_b_x64, amount0)?;
        let liquidity1 = get_liquidity_for_amount_1(sqrt_ratio_a_x64, sqrt_price_x64, amount1)?;

        Ok(liquidity0.min(liquidity1))
    } else {
        get_liquidity_for_amount_1(sqrt_ratio_a_x64, sqrt_ratio_b_x64, amount1)
    }
}

// ============================================================================
// Amounts From Liquidity
// ============================================================================

/// Token amounts backing `liquidity` at the current price
pub fn get_amounts_for_liquidity(
    sqrt_price_x64: u128,
    sqrt_ratio_a_x64: u128,
    sqrt_ratio_b_x64: u128,
    liquidity: u128,
    round_up: bool,
) -> MathResult<(u128, u128)> {
    let (sqrt_ratio_a_x64, sqrt_ratio_b_x64) = sorted(sqrt_ratio_a_x64, sqrt_ratio_b_x64);

    if sqrt_price_x64 <= sqrt_ratio_a_x64 {
        Ok((
            get_amount_0_delta(sqrt_ratio_a_x64, sqrt_ratio_b_x64, liquidity, round_up)?,
            0,
        ))
    } else if sqrt_price_x64 < sqrt_ratio_b_x64 {
        Ok((
            get_amount_0_delta(sqrt_price_x64, sqrt_ratio_b_x64, liquidity, round_up)?,
            get_amount_1_delta(sqrt_ratio_a_x64, sqrt_price_x64, liquidity, round_up)?,
        ))
    } else {
        Ok((
            0,
            get_amount_1_delta(sqrt_ratio_a_x64, sqrt_ratio_b_x64, liquidity, round_up)?,
        ))
    }
}

// ============================================================================
// Price Ratio
// ============================================================================

/// Price of token0 denominated in token1, PRECISION-scaled
///
/// `sqrt_price^2 * PRECISION / 2^128`. A Q64.64 sqrt price is below 2^96,
/// so the numerator stays under 2^253.
pub fn sqrt_price_to_price(sqrt_price_x64: u128) -> MathResult<u128> {
    let sqrt_price = U256::new(sqrt_price_x64);
    let numerator = sqrt_price
        .checked_mul(sqrt_price)
        .and_then(|squared| squared.checked_mul(U256::new(PRECISION)))
        .ok_or(MathError::Overflow)?;
    narrow(numerator / U256::from_words(1, 0))
}
