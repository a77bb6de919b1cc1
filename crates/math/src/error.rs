//! # Math Error Types

use thiserror::Error;

/// Errors produced by the fixed-point and AMM math routines
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathError {
    #[error("Math overflow")]
    Overflow,

    #[error("Math underflow")]
    Underflow,

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Tick {0} out of range")]
    TickOutOfRange(i32),

    #[error("Sqrt price {0} out of range")]
    SqrtPriceOutOfRange(u128),

    #[error("Invalid price range")]
    InvalidPriceRange,
}

/// Result type for math operations
pub type MathResult<T> = Result<T, MathError>;
