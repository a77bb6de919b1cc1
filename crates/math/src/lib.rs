/// Mathematical utilities for the RangeVault engine
///
/// This crate provides overflow-checked arithmetic, PRECISION-scaled
/// fractions, tick to square-root price conversion and the concentrated
/// liquidity formulas the vault uses to size mints and rebalances.

pub mod big_int;
pub mod constants;
pub mod error;
pub mod fixed_point;
pub mod liquidity_math;
pub mod safe;
pub mod tick_math;

// Re-export commonly used items
pub use big_int::{mul_div, mul_div_u256, narrow, Rounding};
pub use constants::*;
pub use error::{MathError, MathResult};
pub use fixed_point::*;
pub use liquidity_math::*;
pub use safe::*;
pub use tick_math::*;
