//! # Math Constants
//!
//! Fixed-point scales and tick bounds shared by the vault engine.

// ============================================================================
// Fixed-Point Scales
// ============================================================================

/// Scale for dimensionless fractions and prices (1.0 == 10^18)
pub const PRECISION: u128 = 1_000_000_000_000_000_000;

/// Q64 fixed-point scale factor: 2^64
pub const Q64: u128 = 1u128 << 64;

/// Basis points denominator (10,000 = 100%)
pub const BPS_DENOMINATOR: u128 = 10_000;

/// Oracle answers carry 8 decimals
pub const ORACLE_DECIMALS: u32 = 8;

/// Scale of an oracle answer (1.0 == 10^8)
pub const ORACLE_SCALE: u128 = 100_000_000;

// ============================================================================
// Tick Bounds
// ============================================================================

/// Minimum tick so that Q64.64 square-root prices stay above 2^32
pub const MIN_TICK: i32 = -443_636;

/// Maximum tick so that Q64.64 square-root prices stay below 2^96
pub const MAX_TICK: i32 = 443_636;

/// Square-root price at MIN_TICK (Q64.64)
pub const MIN_SQRT_RATIO: u128 = 4_295_128_740;

/// Square-root price at MAX_TICK (Q64.64)
pub const MAX_SQRT_RATIO: u128 = 79_226_673_515_401_279_992_447_579_055;
