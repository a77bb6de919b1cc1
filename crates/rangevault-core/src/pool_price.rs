//! # Pool Price Reader
//!
//! Reads the main pool's price and combines it with the oracle's base-asset
//! price into a [`PriceQuote`], the single source for every cross-unit
//! conversion in the engine.

use crate::errors::{VaultError, VaultResult};
use crate::interfaces::ConcentratedPool;
use crate::math::{div_fraction, mul_fraction, safe_add, sqrt_price_to_price, PRECISION};
use crate::types::{Leg, Slot0};

/// Reads price state straight from the pool; always current
pub struct PoolPriceReader<'a> {
    pool: &'a dyn ConcentratedPool,
}

impl<'a> PoolPriceReader<'a> {
    pub fn new(pool: &'a dyn ConcentratedPool) -> Self {
        Self { pool }
    }

    /// Q64.64 sqrt price and tick
    pub fn current_price_and_tick(&self) -> Slot0 {
        self.pool.slot0()
    }

    /// Price of token0 in token1, PRECISION-scaled
    pub fn token_price_ratio(&self) -> VaultResult<u128> {
        Ok(sqrt_price_to_price(self.pool.slot0().sqrt_price_x64)?)
    }
}

/// Prices validated for one step of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceQuote {
    /// Main pool Q64.64 sqrt price
    pub sqrt_price_x64: u128,
    /// Main pool tick
    pub tick: i32,
    /// Token0 in token1, PRECISION-scaled
    pub pool_price: u128,
    /// Base asset in token1, PRECISION-scaled
    pub base_price: u128,
}

impl PriceQuote {
    /// Token1-equivalent value of a base-asset amount
    pub fn base_value(&self, amount: u128) -> VaultResult<u128> {
        Ok(mul_fraction(amount, self.base_price)?)
    }

    /// Token1-equivalent value of a token0 amount
    pub fn token0_value(&self, amount0: u128) -> VaultResult<u128> {
        Ok(mul_fraction(amount0, self.pool_price)?)
    }

    /// Token1-equivalent value of mixed holdings
    pub fn value_in_token1(&self, amount0: u128, amount1: u128, base: u128) -> VaultResult<u128> {
        let value = safe_add(self.token0_value(amount0)?, amount1)?;
        Ok(safe_add(value, self.base_value(base)?)?)
    }

    /// Convert a token1-equivalent value to token0 units
    pub fn token1_to_token0(&self, value: u128) -> VaultResult<u128> {
        if self.pool_price == 0 {
            return Err(VaultError::InvalidInput("pool price rounds to zero".to_string()));
        }
        Ok(div_fraction(value, self.pool_price)?)
    }

    /// Price of a leg token in base-asset units, PRECISION-scaled
    pub fn leg_price_in_base(&self, leg: Leg) -> VaultResult<u128> {
        if self.base_price == 0 {
            return Err(VaultError::StaleOrInvalidPrice("base price rounds to zero".to_string()));
        }
        match leg {
            Leg::Token0 => Ok(div_fraction(self.pool_price, self.base_price)?),
            Leg::Token1 => Ok(div_fraction(PRECISION, self.base_price)?),
        }
    }
}
