/// Safe arithmetic operations with overflow protection
///
/// All operations return errors instead of panicking.

use crate::error::{MathError, MathResult};

// ============================================================================
// Safe Basic Arithmetic
// ============================================================================

/// Safe addition for u128 values
pub fn safe_add(a: u128, b: u128) -> MathResult<u128> {
    a.checked_add(b).ok_or(MathError::Overflow)
}

/// Safe subtraction for u128 values
pub fn safe_sub(a: u128, b: u128) -> MathResult<u128> {
    a.checked_sub(b).ok_or(MathError::Underflow)
}

/// Safe multiplication for u128 values
pub fn safe_mul(a: u128, b: u128) -> MathResult<u128> {
    a.checked_mul(b).ok_or(MathError::Overflow)
}

/// Safe division for u128 values
pub fn safe_div(a: u128, b: u128) -> MathResult<u128> {
    if b == 0 {
        return Err(MathError::DivisionByZero);
    }
    Ok(a / b)
}
