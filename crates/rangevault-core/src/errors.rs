//! # Vault Error Types
//!
//! Every public operation is all-or-nothing: any of these errors aborts the
//! whole call and the engine restores its own state.

use rangevault_math::MathError;
use thiserror::Error;

use crate::types::Address;

/// Errors raised by the vault engine and reward distributor
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VaultError {
    // ========================================================================
    // Input Errors
    // ========================================================================
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // Execution Errors
    // ========================================================================
    #[error("Insufficient output: expected at least {min_out}, received {received}")]
    InsufficientOutput { min_out: u128, received: u128 },

    #[error("Stale or invalid price: {0}")]
    StaleOrInvalidPrice(String),

    #[error("Token transfer failed: {0}")]
    TransferFailed(String),

    #[error("Math error: {0}")]
    Math(#[from] MathError),

    // ========================================================================
    // Authorization Errors
    // ========================================================================
    #[error("Caller {0} is not authorized")]
    CallerNotAuthorized(Address),

    #[error("Reentrancy detected")]
    ReentrancyDetected,

    // ========================================================================
    // Balance Errors
    // ========================================================================
    #[error("No balance")]
    NoBalance,

    #[error("No claimable rewards")]
    NoClaimable,
}

/// Result type for vault operations
pub type VaultResult<T> = Result<T, VaultError>;

impl VaultError {
    /// Out-of-bounds parameter with the value and what was expected
    pub fn invalid_parameter(name: &str, value: &str, expected: &str) -> Self {
        VaultError::InvalidInput(format!("{} = {} (expected {})", name, value, expected))
    }

    /// Transfer failure with token and counterparties
    pub fn transfer_failed(token: &Address, from: &Address, to: &Address, amount: u128) -> Self {
        VaultError::TransferFailed(format!(
            "{} of {} from {} to {}",
            amount, token, from, to
        ))
    }
}
