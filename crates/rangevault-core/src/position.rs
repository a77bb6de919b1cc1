//! # Liquidity Position
//!
//! Tracks the vault's active tick range on the main pool and performs the
//! pool-side steps of every transition: fee harvest through a zero burn,
//! full burns, and guarded mints.

use tracing::{debug, info};

use crate::constants::{DUST_THRESHOLD, MINT_BUFFER};
use crate::errors::{VaultError, VaultResult};
use crate::interfaces::{ConcentratedPool, TokenLedger};
use crate::math::{get_amounts_for_liquidity, get_liquidity_for_amounts, get_sqrt_price_at_tick};
use crate::reentrancy::{CallbackGuard, CallbackKind};
use crate::swap_router::Settlement;
use crate::types::{Address, TickRange, VaultStatus};

/// Vault-side view of the position on the main pool
#[derive(Debug, Clone)]
pub struct LiquidityPosition {
    owner: Address,
    range: TickRange,
    mint_guard: CallbackGuard,
}

impl LiquidityPosition {
    /// Flat position owned by `owner`
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            range: TickRange::FLAT,
            mint_guard: CallbackGuard::default(),
        }
    }

    pub fn range(&self) -> TickRange {
        self.range
    }

    pub fn is_flat(&self) -> bool {
        self.range.is_flat()
    }

    pub fn status(&self) -> VaultStatus {
        if self.is_flat() {
            VaultStatus::Flat
        } else {
            VaultStatus::InRange {
                lower: self.range.lower,
                upper: self.range.upper,
            }
        }
    }

    /// Set new bounds; liquidity at the old bounds must already be burned
    pub fn set_range(&mut self, range: TickRange) {
        self.range = range;
    }

    /// Return to the flat sentinel
    pub fn clear(&mut self) {
        self.range = TickRange::FLAT;
    }

    /// Liquidity currently held at the active range
    pub fn liquidity(&self, pool: &dyn ConcentratedPool) -> u128 {
        if self.is_flat() {
            return 0;
        }
        pool.position(&self.owner, self.range.lower, self.range.upper)
            .liquidity
    }

    /// Token amounts backing the current liquidity at the pool price
    pub fn amounts(&self, pool: &dyn ConcentratedPool) -> VaultResult<(u128, u128)> {
        let liquidity = self.liquidity(pool);
        if liquidity == 0 {
            return Ok((0, 0));
        }
        let (sqrt_lower, sqrt_upper) = self.sqrt_bounds()?;
        Ok(get_amounts_for_liquidity(
            pool.slot0().sqrt_price_x64,
            sqrt_lower,
            sqrt_upper,
            liquidity,
            false,
        )?)
    }

    fn sqrt_bounds(&self) -> VaultResult<(u128, u128)> {
        Ok((
            get_sqrt_price_at_tick(self.range.lower)?,
            get_sqrt_price_at_tick(self.range.upper)?,
        ))
    }

    fn leg_balances(&self, ledger: &dyn TokenLedger, pool: &dyn ConcentratedPool) -> (u128, u128) {
        (
            ledger.balance_of(&pool.token0(), &self.owner),
            ledger.balance_of(&pool.token1(), &self.owner),
        )
    }

    /// Collect accrued fees; returns the leg balance deltas
    ///
    /// A zero-liquidity burn makes the pool bring the position's fee
    /// accounting up to date before the collect.
    pub fn collect_fees(
        &mut self,
        ledger: &mut dyn TokenLedger,
        pool: &mut dyn ConcentratedPool,
    ) -> VaultResult<(u128, u128)> {
        if self.liquidity(pool) == 0 {
            return Ok((0, 0));
        }

        let TickRange { lower, upper } = self.range;
        let (before0, before1) = self.leg_balances(ledger, pool);
        pool.burn(&self.owner, lower, upper, 0)?;
        pool.collect(ledger, &self.owner, &self.owner, lower, upper, u128::MAX, u128::MAX)?;
        let (after0, after1) = self.leg_balances(ledger, pool);

        let fees = (after0.saturating_sub(before0), after1.saturating_sub(before1));
        debug!("Collected fees {:?} from [{}, {}]", fees, lower, upper);
        Ok(fees)
    }

    /// Burn all liquidity at the active range and collect the proceeds
    pub fn burn_all(
        &mut self,
        ledger: &mut dyn TokenLedger,
        pool: &mut dyn ConcentratedPool,
    ) -> VaultResult<(u128, u128)> {
        let liquidity = self.liquidity(pool);
        if liquidity == 0 {
            return Ok((0, 0));
        }

        let TickRange { lower, upper } = self.range;
        pool.burn(&self.owner, lower, upper, liquidity)?;
        let collected = pool.collect(ledger, &self.owner, &self.owner, lower, upper, u128::MAX, u128::MAX)?;

        info!("Burned {} liquidity from [{}, {}], collected {:?}", liquidity, lower, upper, collected);
        Ok(collected)
    }

    /// Mint the largest liquidity the given leg amounts support at the current price
    ///
    /// Returns zero without calling the pool when both legs are dust.
    pub fn mint(
        &mut self,
        ledger: &mut dyn TokenLedger,
        pool: &mut dyn ConcentratedPool,
        amount0: u128,
        amount1: u128,
    ) -> VaultResult<u128> {
        if self.is_flat() {
            return Err(VaultError::InvalidInput("cannot mint without a tick range".to_string()));
        }
        if amount0 <= DUST_THRESHOLD && amount1 <= DUST_THRESHOLD {
            return Ok(0);
        }

        let (sqrt_lower, sqrt_upper) = self.sqrt_bounds()?;
        let liquidity = get_liquidity_for_amounts(
            pool.slot0().sqrt_price_x64,
            sqrt_lower,
            sqrt_upper,
            amount0.saturating_sub(MINT_BUFFER),
            amount1.saturating_sub(MINT_BUFFER),
        )?;
        if liquidity == 0 {
            return Ok(0);
        }

        let TickRange { lower, upper } = self.range;
        let pool_address = pool.address();
        let (token0, token1) = (pool.token0(), pool.token1());

        self.mint_guard.begin(CallbackKind::Mint, pool_address)?;
        let result = {
            let mut settlement = Settlement {
                guard: &mut self.mint_guard,
                kind: CallbackKind::Mint,
                payer: self.owner,
                token0,
                token1,
            };
            pool.mint(ledger, &self.owner, lower, upper, liquidity, &mut settlement)
        };
        let settled = self.mint_guard.finish();
        let (owed0, owed1) = result?;

        if !settled && (owed0 > 0 || owed1 > 0) {
            return Err(VaultError::InvalidInput(format!(
                "pool {} reported owed amounts without settling",
                pool_address
            )));
        }

        info!(
            "Minted {} liquidity at [{}, {}] for ({}, {})",
            liquidity, lower, upper, owed0, owed1
        );
        Ok(liquidity)
    }

    /// Settle a mint callback arriving outside `mint`; only valid inside an open section
    pub fn settle_mint(
        &mut self,
        ledger: &mut dyn TokenLedger,
        caller: &Address,
        token0: Address,
        token1: Address,
        owed0: u128,
        owed1: u128,
    ) -> VaultResult<()> {
        use crate::interfaces::MintCallback;

        let mut settlement = Settlement {
            guard: &mut self.mint_guard,
            kind: CallbackKind::Mint,
            payer: self.owner,
            token0,
            token1,
        };
        settlement.mint_callback(ledger, caller, owed0, owed1)
    }
}
