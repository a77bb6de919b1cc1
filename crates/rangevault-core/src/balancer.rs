//! # Range Balancer
//!
//! Works out how a vault's value should be split between the two legs for a
//! full mint at the active tick range, and sizes the single swap that moves
//! actual holdings onto that split.
//!
//! The target is evaluated at the *current* pool price: liquidity obtainable
//! from the whole value held as token0 (`liquidity0`, over `[price, upper]`)
//! and from the whole value held as token1 (`liquidity1`, over
//! `[lower, price]`). A mint consumes both legs fully when
//! `value0 / liquidity0_per_value == value1 / liquidity1_per_value`, which
//! gives a token0 value share of `liquidity1 / (liquidity0 + liquidity1)`.

use crate::constants::PROBE_VALUE;
use crate::errors::{VaultError, VaultResult};
use crate::math::{
    complement, get_liquidity_for_amount_0, get_liquidity_for_amount_1, get_sqrt_price_at_tick,
    mul_div, mul_fraction, ratio, safe_add, Rounding, PRECISION,
};
use crate::pool_price::PriceQuote;
use crate::types::TickRange;

/// Swap that moves holdings toward the target split
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedSwap {
    /// true: sell token0 for token1
    pub zero_for_one: bool,
    pub amount_in: u128,
}

/// Base-asset amount split across the two legs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseSplit {
    pub to_token0: u128,
    pub to_token1: u128,
}

/// Target-split calculator for one tick range and one price quote
#[derive(Debug, Clone, Copy)]
pub struct RangeBalancer<'a> {
    quote: &'a PriceQuote,
    sqrt_lower_x64: u128,
    sqrt_upper_x64: u128,
}

impl<'a> RangeBalancer<'a> {
    pub fn new(range: TickRange, quote: &'a PriceQuote) -> VaultResult<Self> {
        if range.is_flat() {
            return Err(VaultError::InvalidInput("no active tick range".to_string()));
        }
        Ok(Self {
            quote,
            sqrt_lower_x64: get_sqrt_price_at_tick(range.lower)?,
            sqrt_upper_x64: get_sqrt_price_at_tick(range.upper)?,
        })
    }

    /// Share of total value a full mint holds as token0, PRECISION-scaled
    pub fn target_token0_fraction(&self, amount0: u128, amount1: u128) -> VaultResult<u128> {
        let sqrt_price = self.quote.sqrt_price_x64;
        if sqrt_price <= self.sqrt_lower_x64 {
            return Ok(PRECISION);
        }
        if sqrt_price >= self.sqrt_upper_x64 {
            return Ok(0);
        }

        let value1 = self
            .quote
            .value_in_token1(amount0, amount1, 0)?
            .max(PROBE_VALUE);
        let value0 = self.quote.token1_to_token0(value1)?;

        let liquidity0 = get_liquidity_for_amount_0(sqrt_price, self.sqrt_upper_x64, value0)?;
        let liquidity1 = get_liquidity_for_amount_1(self.sqrt_lower_x64, sqrt_price, value1)?;
        let total = safe_add(liquidity0, liquidity1)?;
        if total == 0 {
            return Err(VaultError::InvalidInput("range holds no liquidity at this price".to_string()));
        }

        Ok(mul_div(liquidity1, PRECISION, total, Rounding::Down)?)
    }

    /// Share of held value that is token0, PRECISION-scaled
    pub fn current_token0_fraction(&self, amount0: u128, amount1: u128) -> VaultResult<u128> {
        let total = self.quote.value_in_token1(amount0, amount1, 0)?;
        if total == 0 {
            return Ok(0);
        }
        Ok(ratio(self.quote.token0_value(amount0)?, total)?)
    }

    /// Single-shot swap toward the target; `None` when already on target
    ///
    /// Swap size is the holding minus the target share of total value in
    /// that token's unit. Market impact is not modelled.
    pub fn rebalance_swap(&self, amount0: u128, amount1: u128) -> VaultResult<Option<PlannedSwap>> {
        let total1 = self.quote.value_in_token1(amount0, amount1, 0)?;
        if total1 == 0 {
            return Ok(None);
        }

        let target = self.target_token0_fraction(amount0, amount1)?;
        let current = self.current_token0_fraction(amount0, amount1)?;

        let plan = if current > target {
            let total0 = self.quote.token1_to_token0(total1)?;
            let desired0 = mul_fraction(total0, target)?;
            PlannedSwap {
                zero_for_one: true,
                amount_in: amount0.saturating_sub(desired0),
            }
        } else if current < target {
            let desired1 = mul_fraction(total1, complement(target))?;
            PlannedSwap {
                zero_for_one: false,
                amount_in: amount1.saturating_sub(desired1),
            }
        } else {
            return Ok(None);
        };

        Ok((plan.amount_in > 0).then_some(plan))
    }

    /// Split a fresh base-asset amount by the token0 fraction and its complement
    pub fn split_base_amount(&self, amount: u128, token0_fraction: u128) -> VaultResult<BaseSplit> {
        let to_token0 = mul_fraction(amount, token0_fraction.min(PRECISION))?;
        Ok(BaseSplit {
            to_token0,
            to_token1: amount - to_token0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{sqrt_price_to_price, Q64};

    fn quote_at_tick(tick: i32) -> PriceQuote {
        let sqrt_price_x64 = get_sqrt_price_at_tick(tick).unwrap();
        PriceQuote {
            sqrt_price_x64,
            tick,
            pool_price: sqrt_price_to_price(sqrt_price_x64).unwrap(),
            base_price: PRECISION,
        }
    }

    /// Apply a planned swap at the quoted price with no impact
    fn apply(quote: &PriceQuote, a0: u128, a1: u128, plan: PlannedSwap) -> (u128, u128) {
        if plan.zero_for_one {
            (a0 - plan.amount_in, a1 + quote.token0_value(plan.amount_in).unwrap())
        } else {
            (a0 + quote.token1_to_token0(plan.amount_in).unwrap(), a1 - plan.amount_in)
        }
    }

    #[test]
    fn test_symmetric_range_targets_half() {
        let quote = quote_at_tick(0);
        assert_eq!(quote.sqrt_price_x64, Q64);
        let balancer = RangeBalancer::new(TickRange::new(-600, 600).unwrap(), &quote).unwrap();
        let target = balancer.target_token0_fraction(1_000_000, 0).unwrap();
        assert!(target.abs_diff(PRECISION / 2) < PRECISION / 1_000_000);
    }

    #[test]
    fn test_skewed_range_targets() {
        let quote = quote_at_tick(0);
        // Price near the lower bound: mostly token0
        let low = RangeBalancer::new(TickRange::new(-60, 6_000).unwrap(), &quote).unwrap();
        assert!(low.target_token0_fraction(1, 1).unwrap() > PRECISION * 9 / 10);
        // Price near the upper bound: mostly token1
        let high = RangeBalancer::new(TickRange::new(-6_000, 60).unwrap(), &quote).unwrap();
        assert!(high.target_token0_fraction(1, 1).unwrap() < PRECISION / 10);
    }

    #[test]
    fn test_out_of_range_targets() {
        let quote = quote_at_tick(0);
        let above = RangeBalancer::new(TickRange::new(60, 600).unwrap(), &quote).unwrap();
        assert_eq!(above.target_token0_fraction(5, 5).unwrap(), PRECISION);
        let below = RangeBalancer::new(TickRange::new(-600, -60).unwrap(), &quote).unwrap();
        assert_eq!(below.target_token0_fraction(5, 5).unwrap(), 0);
    }

    #[test]
    fn test_rebalance_converges_from_token0() {
        let quote = quote_at_tick(6_932);
        let balancer = RangeBalancer::new(TickRange::new(3_000, 12_000).unwrap(), &quote).unwrap();

        let (a0, a1) = (10_000_000u128, 0u128);
        let plan = balancer.rebalance_swap(a0, a1).unwrap().unwrap();
        assert!(plan.zero_for_one);

        let (b0, b1) = apply(&quote, a0, a1, plan);
        let target = balancer.target_token0_fraction(b0, b1).unwrap();
        let current = balancer.current_token0_fraction(b0, b1).unwrap();
        assert!(current.abs_diff(target) < PRECISION / 100_000);
    }

    #[test]
    fn test_rebalance_converges_from_token1() {
        let quote = quote_at_tick(-2_000);
        let balancer = RangeBalancer::new(TickRange::new(-4_000, 1_000).unwrap(), &quote).unwrap();

        let (a0, a1) = (1_000u128, 50_000_000u128);
        let plan = balancer.rebalance_swap(a0, a1).unwrap().unwrap();
        assert!(!plan.zero_for_one);

        let (b0, b1) = apply(&quote, a0, a1, plan);
        let target = balancer.target_token0_fraction(b0, b1).unwrap();
        let current = balancer.current_token0_fraction(b0, b1).unwrap();
        assert!(current.abs_diff(target) < PRECISION / 100_000);
    }

    #[test]
    fn test_balanced_holdings_mint_fully() {
        use crate::math::{get_amounts_for_liquidity, get_liquidity_for_amounts};

        let quote = quote_at_tick(1_000);
        let range = TickRange::new(-1_000, 5_000).unwrap();
        let balancer = RangeBalancer::new(range, &quote).unwrap();
        let plan = balancer.rebalance_swap(0, 100_000_000).unwrap().unwrap();
        let (b0, b1) = apply(&quote, 0, 100_000_000, plan);

        let sa = get_sqrt_price_at_tick(range.lower).unwrap();
        let sb = get_sqrt_price_at_tick(range.upper).unwrap();
        let liquidity = get_liquidity_for_amounts(quote.sqrt_price_x64, sa, sb, b0, b1).unwrap();
        let (used0, used1) = get_amounts_for_liquidity(quote.sqrt_price_x64, sa, sb, liquidity, false).unwrap();

        // Both legs are consumed almost entirely
        assert!(b0 - used0 <= b0 / 10_000 + 2);
        assert!(b1 - used1 <= b1 / 10_000 + 2);
    }

    #[test]
    fn test_split_base_amount() {
        let quote = quote_at_tick(0);
        let balancer = RangeBalancer::new(TickRange::new(-600, 600).unwrap(), &quote).unwrap();
        let split = balancer.split_base_amount(1_001, PRECISION / 2).unwrap();
        assert_eq!(split, BaseSplit { to_token0: 500, to_token1: 501 });
    }

    #[test]
    fn test_flat_range_rejected() {
        let quote = quote_at_tick(0);
        assert!(RangeBalancer::new(TickRange::FLAT, &quote).is_err());
    }

    #[test]
    fn test_empty_holdings_need_no_swap() {
        let quote = quote_at_tick(0);
        let balancer = RangeBalancer::new(TickRange::new(-600, 600).unwrap(), &quote).unwrap();
        assert_eq!(balancer.rebalance_swap(0, 0).unwrap(), None);
    }
}
