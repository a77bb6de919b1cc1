//! Shared test infrastructure for vault integration tests
//!
//! In-memory ledger, constant-price pool and oracle doubles, plus a
//! fixture that wires them into a `VaultEngine`.

#![allow(dead_code)]

pub mod fixtures;
pub mod ledger;
pub mod pool;
pub mod tracing;

pub use fixtures::{Fixture, MockClock, MockFeed, ADMIN, MANAGER, START_TIME};
pub use ledger::SharedLedger;
pub use pool::MockPool;
pub use self::tracing::init_test_tracing;

pub use rangevault_core::math::PRECISION;
pub use rangevault_core::*;

/// One whole token at 18 decimals
pub const ONE: u128 = PRECISION;

pub fn user(id: u64) -> Address {
    Address::from_low_u64(0xa000 + id)
}
