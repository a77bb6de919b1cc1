//! # Vault Constants

pub use rangevault_math::constants::{ORACLE_SCALE, PRECISION};

// ============================================================================
// Oracle
// ============================================================================

/// Oracle answers older than this are rejected (20 minutes)
pub const ORACLE_STALENESS_WINDOW_SECS: u64 = 20 * 60;

// ============================================================================
// Fees and Limits
// ============================================================================

/// Deposit fee cap in basis points (10%)
pub const MAX_DEPOSIT_FEE_BPS: u32 = 1_000;

/// Upper bound for any basis-point setting (100%)
pub const MAX_BPS: u32 = 10_000;

// ============================================================================
// Dust Control
// ============================================================================

/// Rebalance swaps and mints at or below this many raw units are skipped
pub const DUST_THRESHOLD: u128 = 1_000;

/// Units held back per leg when minting, covering the pool's round-up of owed amounts
pub const MINT_BUFFER: u128 = 2;

/// Value used to evaluate the target fraction when the vault holds nothing
pub const PROBE_VALUE: u128 = PRECISION;
