//! # 256-bit Intermediate Arithmetic
//!
//! Products of two `u128` values always fit in 256 bits, so every
//! `a * b / d` in the engine is evaluated through `ethnum::U256` and
//! narrowed back with an explicit overflow check.

use ethnum::U256;

use crate::error::{MathError, MathResult};

/// Rounding direction for division results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    Down,
    Up,
}

/// Narrow a 256-bit value to u128
pub fn narrow(value: U256) -> MathResult<u128> {
    let (high, low) = value.into_words();
    if high != 0 {
        return Err(MathError::Overflow);
    }
    Ok(low)
}

/// Compute `a * b / denominator` without intermediate overflow
pub fn mul_div(a: u128, b: u128, denominator: u128, rounding: Rounding) -> MathResult<u128> {
    narrow(mul_div_u256(U256::new(a), U256::new(b), U256::new(denominator), rounding)?)
}

/// 256-bit mul-div; fails if the product itself overflows 256 bits
pub fn mul_div_u256(a: U256, b: U256, denominator: U256, rounding: Rounding) -> MathResult<U256> {
    if denominator == U256::ZERO {
        return Err(MathError::DivisionByZero);
    }
    let product = a.checked_mul(b).ok_or(MathError::Overflow)?;
    let quotient = product / denominator;
    match rounding {
        Rounding::Up if product % denominator != U256::ZERO => quotient
            .checked_add(U256::ONE)
            .ok_or(MathError::Overflow),
        _ => Ok(quotient),
    }
}
