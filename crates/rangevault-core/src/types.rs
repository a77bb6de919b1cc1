//! # Core Types
//!
//! Identities, tick ranges and the plain data records exchanged with
//! collaborators.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::{VaultError, VaultResult};
use crate::math::{MAX_TICK, MIN_TICK};

// ============================================================================
// Address
// ============================================================================

/// 20-byte account identity
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub const fn new(bytes: [u8; 20]) -> Self {
        Address(bytes)
    }

    /// Address whose low 8 bytes hold `value` big-endian
    pub fn from_low_u64(value: u64) -> Self {
        let mut bytes = [0u8; 20];
        bytes[12..].copy_from_slice(&value.to_be_bytes());
        Address(bytes)
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for byte in self.0.iter() {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix("0x").unwrap_or(s);
        if hex.len() != 40 || !hex.is_ascii() {
            return Err(VaultError::invalid_parameter("address", s, "40 hex digits"));
        }

        let mut bytes = [0u8; 20];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
                .map_err(|_| VaultError::invalid_parameter("address", s, "hex digits"))?;
        }
        Ok(Address(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Roles
// ============================================================================

/// Capabilities checked by the access-control collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Configuration changes
    Admin,
    /// Opening, closing and moving the position
    Manager,
}

// ============================================================================
// Tick Range and Status
// ============================================================================

/// Active tick range; equal bounds mean no position
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickRange {
    pub lower: i32,
    pub upper: i32,
}

impl TickRange {
    pub const FLAT: TickRange = TickRange { lower: 0, upper: 0 };

    /// Validated in-range bounds
    pub fn new(lower: i32, upper: i32) -> VaultResult<Self> {
        if lower >= upper {
            return Err(VaultError::invalid_parameter(
                "tick_lower",
                &lower.to_string(),
                &format!("less than tick_upper ({})", upper),
            ));
        }
        if lower < MIN_TICK || upper > MAX_TICK {
            return Err(VaultError::invalid_parameter(
                "tick_range",
                &format!("[{}, {}]", lower, upper),
                &format!("within [{}, {}]", MIN_TICK, MAX_TICK),
            ));
        }
        Ok(TickRange { lower, upper })
    }

    pub fn is_flat(&self) -> bool {
        self.lower == self.upper
    }
}

/// Position state of a vault
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VaultStatus {
    /// All value held as base asset
    Flat,
    /// Value split into legs and provided as liquidity
    InRange { lower: i32, upper: i32 },
}

/// One of the main pool's two tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leg {
    Token0,
    Token1,
}

// ============================================================================
// Collaborator Records
// ============================================================================

/// Price feed round, 8-decimal answer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundData {
    pub round_id: u64,
    pub answer: i128,
    pub started_at: u64,
    pub updated_at: u64,
    pub answered_in_round: u64,
}

/// Current pool price
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot0 {
    pub sqrt_price_x64: u128,
    pub tick: i32,
}

/// Pool-side state of a position
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PositionInfo {
    pub liquidity: u128,
    pub tokens_owed0: u128,
    pub tokens_owed1: u128,
}

// ============================================================================
// Engine Results
// ============================================================================

/// Vault-owned balances, reward escrow excluded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Holdings {
    pub amount0: u128,
    pub amount1: u128,
    /// Base asset not already counted as a leg
    pub base: u128,
}

/// Assets paid out by a withdrawal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Withdrawal {
    pub shares: u128,
    pub amount0: u128,
    pub amount1: u128,
    pub base: u128,
}

/// Point-in-time view of a vault
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VaultSnapshot {
    pub vault: Address,
    pub status: VaultStatus,
    pub total_supply: u128,
    pub depositors: usize,
    pub holdings: Holdings,
    pub position_liquidity: u128,
    pub reward_escrow: u128,
    /// Token1-equivalent units
    pub total_value: u128,
    /// PRECISION-scaled value per share, zero with no supply
    pub share_price: u128,
}
