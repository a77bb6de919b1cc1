//! Constant-price concentrated-liquidity pool double
//!
//! Swaps fill at the current price without moving it. Mint, burn and
//! collect follow the usual owed-amount accounting so the vault's balance
//! deltas line up with what a real pool would produce. Switches allow the
//! pool to misbehave: charge a fee, shortchange the recipient, or invoke
//! the settlement callback twice.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use rangevault_core::math::{
    complement, div_fraction, fraction_from_bps, get_amounts_for_liquidity,
    get_sqrt_price_at_tick, mul_fraction, sqrt_price_to_price,
};
use rangevault_core::{
    Address, ConcentratedPool, MintCallback, PositionInfo, Slot0, SwapCallback, TokenLedger,
    VaultError, VaultResult,
};

#[derive(Debug, Default, Clone, Copy)]
struct PositionState {
    liquidity: u128,
    owed0: u128,
    owed1: u128,
    pending0: u128,
    pending1: u128,
}

struct PoolState {
    address: Address,
    token0: Address,
    token1: Address,
    sqrt_price_x64: u128,
    tick: i32,
    fee_bps: u32,
    shortchange_bps: u32,
    double_callback: bool,
    positions: HashMap<(Address, i32, i32), PositionState>,
    swaps: usize,
}

/// Cloneable handle; the vault owns one clone, the test keeps another
#[derive(Clone)]
pub struct MockPool {
    state: Rc<RefCell<PoolState>>,
}

impl MockPool {
    pub fn new(address: Address, token0: Address, token1: Address, tick: i32) -> Self {
        let pool = Self {
            state: Rc::new(RefCell::new(PoolState {
                address,
                token0,
                token1,
                sqrt_price_x64: 0,
                tick: 0,
                fee_bps: 0,
                shortchange_bps: 0,
                double_callback: false,
                positions: HashMap::new(),
                swaps: 0,
            })),
        };
        pool.set_tick(tick);
        pool
    }

    pub fn set_tick(&self, tick: i32) {
        let mut state = self.state.borrow_mut();
        state.sqrt_price_x64 = get_sqrt_price_at_tick(tick).unwrap();
        state.tick = tick;
    }

    /// Swap fee kept by the pool
    pub fn set_fee_bps(&self, fee_bps: u32) {
        self.state.borrow_mut().fee_bps = fee_bps;
    }

    /// Pay the recipient less than the reported output
    pub fn set_shortchange_bps(&self, bps: u32) {
        self.state.borrow_mut().shortchange_bps = bps;
    }

    pub fn set_double_callback(&self, enabled: bool) {
        self.state.borrow_mut().double_callback = enabled;
    }

    /// Credit trading fees to every live position of `owner`
    pub fn accrue_fees(&self, owner: &Address, fee0: u128, fee1: u128) {
        let mut state = self.state.borrow_mut();
        for ((position_owner, _, _), position) in state.positions.iter_mut() {
            if position_owner == owner && position.liquidity > 0 {
                position.pending0 += fee0;
                position.pending1 += fee1;
                return;
            }
        }
        panic!("no live position for {}", owner);
    }

    pub fn swap_count(&self) -> usize {
        self.state.borrow().swaps
    }

    pub fn total_liquidity(&self, owner: &Address) -> u128 {
        self.state
            .borrow()
            .positions
            .iter()
            .filter(|((position_owner, _, _), _)| position_owner == owner)
            .map(|(_, position)| position.liquidity)
            .sum()
    }

    fn sqrt_bounds(lower: i32, upper: i32) -> VaultResult<(u128, u128)> {
        Ok((get_sqrt_price_at_tick(lower)?, get_sqrt_price_at_tick(upper)?))
    }

    fn expect_received(
        ledger: &dyn TokenLedger,
        token: &Address,
        pool: &Address,
        before: u128,
        owed: u128,
    ) -> VaultResult<()> {
        let received = ledger.balance_of(token, pool).saturating_sub(before);
        if received < owed {
            return Err(VaultError::TransferFailed(format!(
                "pool {} expected {} of {}, received {}",
                pool, owed, token, received
            )));
        }
        Ok(())
    }
}

impl ConcentratedPool for MockPool {
    fn address(&self) -> Address {
        self.state.borrow().address
    }

    fn token0(&self) -> Address {
        self.state.borrow().token0
    }

    fn token1(&self) -> Address {
        self.state.borrow().token1
    }

    fn slot0(&self) -> Slot0 {
        let state = self.state.borrow();
        Slot0 {
            sqrt_price_x64: state.sqrt_price_x64,
            tick: state.tick,
        }
    }

    fn swap(
        &mut self,
        ledger: &mut dyn TokenLedger,
        recipient: &Address,
        zero_for_one: bool,
        amount_specified: i128,
        _sqrt_price_limit_x64: u128,
        callback: &mut dyn SwapCallback,
    ) -> VaultResult<(i128, i128)> {
        if amount_specified <= 0 {
            return Err(VaultError::InvalidInput("mock pool only supports exact input".to_string()));
        }
        let amount_in = amount_specified as u128;

        let (address, token0, token1, sqrt_price, fee_bps, shortchange_bps, double_callback) = {
            let state = self.state.borrow();
            (
                state.address,
                state.token0,
                state.token1,
                state.sqrt_price_x64,
                state.fee_bps,
                state.shortchange_bps,
                state.double_callback,
            )
        };

        let price = sqrt_price_to_price(sqrt_price)?;
        let gross_out = if zero_for_one {
            mul_fraction(amount_in, price)?
        } else {
            div_fraction(amount_in, price)?
        };
        let amount_out = mul_fraction(gross_out, complement(fraction_from_bps(fee_bps)))?;
        let paid_out = mul_fraction(amount_out, complement(fraction_from_bps(shortchange_bps)))?;

        let (token_in, token_out) = if zero_for_one { (token0, token1) } else { (token1, token0) };
        ledger.transfer(&token_out, &address, recipient, paid_out)?;

        let (delta0, delta1) = if zero_for_one {
            (amount_in as i128, -(amount_out as i128))
        } else {
            (-(amount_out as i128), amount_in as i128)
        };

        let before = ledger.balance_of(&token_in, &address);
        callback.swap_callback(ledger, &address, delta0, delta1)?;
        if double_callback {
            callback.swap_callback(ledger, &address, delta0, delta1)?;
        }
        Self::expect_received(ledger, &token_in, &address, before, amount_in)?;

        self.state.borrow_mut().swaps += 1;
        Ok((delta0, delta1))
    }

    fn mint(
        &mut self,
        ledger: &mut dyn TokenLedger,
        recipient: &Address,
        tick_lower: i32,
        tick_upper: i32,
        liquidity: u128,
        callback: &mut dyn MintCallback,
    ) -> VaultResult<(u128, u128)> {
        let (address, token0, token1, sqrt_price, double_callback) = {
            let state = self.state.borrow();
            (
                state.address,
                state.token0,
                state.token1,
                state.sqrt_price_x64,
                state.double_callback,
            )
        };

        let (sqrt_lower, sqrt_upper) = Self::sqrt_bounds(tick_lower, tick_upper)?;
        let (owed0, owed1) =
            get_amounts_for_liquidity(sqrt_price, sqrt_lower, sqrt_upper, liquidity, true)?;

        let before0 = ledger.balance_of(&token0, &address);
        let before1 = ledger.balance_of(&token1, &address);
        callback.mint_callback(ledger, &address, owed0, owed1)?;
        if double_callback {
            callback.mint_callback(ledger, &address, owed0, owed1)?;
        }
        Self::expect_received(ledger, &token0, &address, before0, owed0)?;
        Self::expect_received(ledger, &token1, &address, before1, owed1)?;

        let mut state = self.state.borrow_mut();
        let position = state
            .positions
            .entry((*recipient, tick_lower, tick_upper))
            .or_default();
        position.liquidity += liquidity;
        Ok((owed0, owed1))
    }

    fn burn(
        &mut self,
        owner: &Address,
        tick_lower: i32,
        tick_upper: i32,
        liquidity: u128,
    ) -> VaultResult<(u128, u128)> {
        let sqrt_price = self.state.borrow().sqrt_price_x64;
        let (sqrt_lower, sqrt_upper) = Self::sqrt_bounds(tick_lower, tick_upper)?;

        let mut state = self.state.borrow_mut();
        let position = state
            .positions
            .get_mut(&(*owner, tick_lower, tick_upper))
            .ok_or_else(|| VaultError::InvalidInput("burn of unknown position".to_string()))?;
        if liquidity > position.liquidity {
            return Err(VaultError::InvalidInput("burn exceeds position liquidity".to_string()));
        }

        let (amount0, amount1) =
            get_amounts_for_liquidity(sqrt_price, sqrt_lower, sqrt_upper, liquidity, false)?;
        position.liquidity -= liquidity;
        position.owed0 += amount0 + std::mem::take(&mut position.pending0);
        position.owed1 += amount1 + std::mem::take(&mut position.pending1);
        Ok((amount0, amount1))
    }

    fn collect(
        &mut self,
        ledger: &mut dyn TokenLedger,
        owner: &Address,
        recipient: &Address,
        tick_lower: i32,
        tick_upper: i32,
        max0: u128,
        max1: u128,
    ) -> VaultResult<(u128, u128)> {
        let (address, token0, token1, amount0, amount1) = {
            let mut state = self.state.borrow_mut();
            let (address, token0, token1) = (state.address, state.token0, state.token1);
            let Some(position) = state.positions.get_mut(&(*owner, tick_lower, tick_upper)) else {
                return Ok((0, 0));
            };
            let amount0 = position.owed0.min(max0);
            let amount1 = position.owed1.min(max1);
            position.owed0 -= amount0;
            position.owed1 -= amount1;
            (address, token0, token1, amount0, amount1)
        };

        if amount0 > 0 {
            ledger.transfer(&token0, &address, recipient, amount0)?;
        }
        if amount1 > 0 {
            ledger.transfer(&token1, &address, recipient, amount1)?;
        }
        Ok((amount0, amount1))
    }

    fn position(&self, owner: &Address, tick_lower: i32, tick_upper: i32) -> PositionInfo {
        self.state
            .borrow()
            .positions
            .get(&(*owner, tick_lower, tick_upper))
            .map(|position| PositionInfo {
                liquidity: position.liquidity,
                tokens_owed0: position.owed0,
                tokens_owed1: position.owed1,
            })
            .unwrap_or_default()
    }
}
