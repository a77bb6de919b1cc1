//! # Swap Router
//!
//! Executes exact-input swaps through the main pool or an auxiliary route.
//! Output is measured from the vault's balance delta rather than taken from
//! the pool's return value, and must reach the caller's minimum.

use tracing::debug;

use crate::errors::{VaultError, VaultResult};
use crate::interfaces::{ConcentratedPool, SwapCallback, TokenLedger};
use crate::math::{complement, div_fraction, mul_fraction, MAX_SQRT_RATIO, MIN_SQRT_RATIO};
use crate::reentrancy::{CallbackGuard, CallbackKind};
use crate::types::Address;

/// How an input amount converts into the output unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    /// Input is the priced token: `amount * price`
    Multiply(u128),
    /// Output is the priced token: `amount / price`
    Divide(u128),
}

/// Auxiliary pool bridging the base asset to one leg
pub struct SwapRoute {
    pub pool: Box<dyn ConcentratedPool>,
    /// Direction is fixed when the route is wired
    pub base_is_token0: bool,
}

impl SwapRoute {
    /// Wire a route, checking the pool trades `base` against `leg`
    pub fn new(pool: Box<dyn ConcentratedPool>, base: &Address, leg: &Address) -> VaultResult<Self> {
        let (token0, token1) = (pool.token0(), pool.token1());
        let base_is_token0 = if token0 == *base && token1 == *leg {
            true
        } else if token1 == *base && token0 == *leg {
            false
        } else {
            return Err(VaultError::InvalidInput(format!(
                "route pool {} trades {}/{}, expected {}/{}",
                pool.address(),
                token0,
                token1,
                base,
                leg
            )));
        };
        Ok(Self { pool, base_is_token0 })
    }

    /// `zero_for_one` for a base to leg swap
    pub fn base_to_leg(&self) -> bool {
        self.base_is_token0
    }

    /// `zero_for_one` for a leg to base swap
    pub fn leg_to_base(&self) -> bool {
        !self.base_is_token0
    }
}

/// Swap executor owned by a vault
#[derive(Debug, Clone)]
pub struct SwapRouter {
    vault: Address,
    guard: CallbackGuard,
}

impl SwapRouter {
    pub fn new(vault: Address) -> Self {
        Self {
            vault,
            guard: CallbackGuard::default(),
        }
    }

    /// Minimum acceptable output: converted input times `1 - slippage`
    pub fn min_amount_out(amount_in: u128, conversion: Conversion, slippage: u128) -> VaultResult<u128> {
        let expected = match conversion {
            Conversion::Multiply(price) => mul_fraction(amount_in, price)?,
            Conversion::Divide(price) => {
                if price == 0 {
                    return Err(VaultError::InvalidInput("conversion price is zero".to_string()));
                }
                div_fraction(amount_in, price)?
            }
        };
        Ok(mul_fraction(expected, complement(slippage))?)
    }

    /// Swap through an optional route; an absent route means the leg is the base asset
    pub fn swap_route(
        &mut self,
        ledger: &mut dyn TokenLedger,
        route: Option<&mut SwapRoute>,
        amount_in: u128,
        min_out: u128,
        zero_for_one: bool,
    ) -> VaultResult<u128> {
        match route {
            Some(route) => self.swap(ledger, route.pool.as_mut(), amount_in, min_out, zero_for_one),
            None => Ok(amount_in),
        }
    }

    /// Exact-input swap with no price limit; slippage is enforced by `min_out`
    pub fn swap(
        &mut self,
        ledger: &mut dyn TokenLedger,
        pool: &mut dyn ConcentratedPool,
        amount_in: u128,
        min_out: u128,
        zero_for_one: bool,
    ) -> VaultResult<u128> {
        if amount_in == 0 {
            return Ok(0);
        }

        let amount_specified = i128::try_from(amount_in)
            .map_err(|_| VaultError::invalid_parameter("amount_in", &amount_in.to_string(), "fits in i128"))?;
        let pool_address = pool.address();
        let (token0, token1) = (pool.token0(), pool.token1());
        let token_out = if zero_for_one { token1 } else { token0 };
        let sqrt_price_limit = if zero_for_one {
            MIN_SQRT_RATIO + 1
        } else {
            MAX_SQRT_RATIO - 1
        };

        let balance_before = ledger.balance_of(&token_out, &self.vault);

        self.guard.begin(CallbackKind::Swap, pool_address)?;
        let result = {
            let mut settlement = Settlement {
                guard: &mut self.guard,
                kind: CallbackKind::Swap,
                payer: self.vault,
                token0,
                token1,
            };
            pool.swap(
                ledger,
                &self.vault,
                zero_for_one,
                amount_specified,
                sqrt_price_limit,
                &mut settlement,
            )
        };
        self.guard.finish();
        result?;

        let received = ledger
            .balance_of(&token_out, &self.vault)
            .saturating_sub(balance_before);
        if received < min_out {
            return Err(VaultError::InsufficientOutput { min_out, received });
        }

        debug!(
            "Swapped {} for {} through {} (zero_for_one={}, min_out={})",
            amount_in, received, pool_address, zero_for_one, min_out
        );
        Ok(received)
    }

    /// Settle a swap callback arriving outside `swap`; only valid inside an open section
    pub fn settle_swap(
        &mut self,
        ledger: &mut dyn TokenLedger,
        caller: &Address,
        token0: Address,
        token1: Address,
        amount0_delta: i128,
        amount1_delta: i128,
    ) -> VaultResult<()> {
        let mut settlement = Settlement {
            guard: &mut self.guard,
            kind: CallbackKind::Swap,
            payer: self.vault,
            token0,
            token1,
        };
        settlement.swap_callback(ledger, caller, amount0_delta, amount1_delta)
    }
}

// ============================================================================
// Settlement
// ============================================================================

/// Pays a pool what it is owed after the guard accepts the callback
pub(crate) struct Settlement<'a> {
    pub guard: &'a mut CallbackGuard,
    pub kind: CallbackKind,
    pub payer: Address,
    pub token0: Address,
    pub token1: Address,
}

impl Settlement<'_> {
    fn pay(&mut self, ledger: &mut dyn TokenLedger, caller: &Address, owed0: u128, owed1: u128) -> VaultResult<()> {
        self.guard.consume(self.kind, caller)?;
        if owed0 > 0 {
            ledger.transfer(&self.token0, &self.payer, caller, owed0)?;
        }
        if owed1 > 0 {
            ledger.transfer(&self.token1, &self.payer, caller, owed1)?;
        }
        Ok(())
    }
}

impl SwapCallback for Settlement<'_> {
    fn swap_callback(
        &mut self,
        ledger: &mut dyn TokenLedger,
        caller: &Address,
        amount0_delta: i128,
        amount1_delta: i128,
    ) -> VaultResult<()> {
        let owed0 = u128::try_from(amount0_delta).unwrap_or(0);
        let owed1 = u128::try_from(amount1_delta).unwrap_or(0);
        self.pay(ledger, caller, owed0, owed1)
    }
}

impl crate::interfaces::MintCallback for Settlement<'_> {
    fn mint_callback(
        &mut self,
        ledger: &mut dyn TokenLedger,
        caller: &Address,
        owed0: u128,
        owed1: u128,
    ) -> VaultResult<()> {
        self.pay(ledger, caller, owed0, owed1)
    }
}
