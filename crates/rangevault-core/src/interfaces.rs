//! # Collaborator Interfaces
//!
//! The engine never implements an AMM, an oracle node or token transfer
//! mechanics. It consumes them through these traits. Every call is
//! synchronous call/return.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::errors::VaultResult;
use crate::types::{Address, PositionInfo, Role, RoundData, Slot0};

/// Fungible token balances and transfers
pub trait TokenLedger {
    fn balance_of(&self, token: &Address, owner: &Address) -> u128;

    /// Move `amount` of `token` from `from` to `to`
    fn transfer(
        &mut self,
        token: &Address,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> VaultResult<()>;
}

/// External price feed with 8-decimal answers
pub trait PriceFeed {
    fn latest_round_data(&self) -> VaultResult<RoundData>;
}

/// Source of the current block time in seconds
pub trait Clock {
    fn now(&self) -> u64;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default()
    }
}

/// Capability check for role-gated entry points
pub trait AccessControl {
    fn has_role(&self, role: Role, account: &Address) -> bool;
}

/// Settlement hook invoked by a pool during `swap`
pub trait SwapCallback {
    /// Positive deltas are owed to the pool by the caller of `swap`
    fn swap_callback(
        &mut self,
        ledger: &mut dyn TokenLedger,
        caller: &Address,
        amount0_delta: i128,
        amount1_delta: i128,
    ) -> VaultResult<()>;
}

/// Settlement hook invoked by a pool during `mint`
pub trait MintCallback {
    fn mint_callback(
        &mut self,
        ledger: &mut dyn TokenLedger,
        caller: &Address,
        owed0: u128,
        owed1: u128,
    ) -> VaultResult<()>;
}

/// Concentrated-liquidity pool
///
/// Token movements happen on the ledger handed to each call; owed amounts
/// are collected through the supplied callback before the call returns.
pub trait ConcentratedPool {
    fn address(&self) -> Address;

    fn token0(&self) -> Address;

    fn token1(&self) -> Address;

    /// Current Q64.64 sqrt price and tick
    fn slot0(&self) -> Slot0;

    /// Exact-input swap when `amount_specified` is positive; returns `(delta0, delta1)`
    #[allow(clippy::too_many_arguments)]
    fn swap(
        &mut self,
        ledger: &mut dyn TokenLedger,
        recipient: &Address,
        zero_for_one: bool,
        amount_specified: i128,
        sqrt_price_limit_x64: u128,
        callback: &mut dyn SwapCallback,
    ) -> VaultResult<(i128, i128)>;

    /// Add liquidity to `(recipient, tick_lower, tick_upper)`; returns `(owed0, owed1)`
    fn mint(
        &mut self,
        ledger: &mut dyn TokenLedger,
        recipient: &Address,
        tick_lower: i32,
        tick_upper: i32,
        liquidity: u128,
        callback: &mut dyn MintCallback,
    ) -> VaultResult<(u128, u128)>;

    /// Remove liquidity; the released amounts become owed to the position.
    /// Burning zero refreshes the position's fee accounting.
    fn burn(
        &mut self,
        owner: &Address,
        tick_lower: i32,
        tick_upper: i32,
        liquidity: u128,
    ) -> VaultResult<(u128, u128)>;

    /// Transfer up to `(max0, max1)` of owed tokens to `recipient`
    #[allow(clippy::too_many_arguments)]
    fn collect(
        &mut self,
        ledger: &mut dyn TokenLedger,
        owner: &Address,
        recipient: &Address,
        tick_lower: i32,
        tick_upper: i32,
        max0: u128,
        max1: u128,
    ) -> VaultResult<(u128, u128)>;

    fn position(&self, owner: &Address, tick_lower: i32, tick_upper: i32) -> PositionInfo;
}

/// What the reward distributor needs from a vault
pub trait RewardSource {
    fn vault_address(&self) -> Address;

    /// Transfer the whole reward escrow to `caller`, returning the amount
    fn release_rewards(&mut self, caller: &Address) -> VaultResult<u128>;

    /// Current depositor registry
    fn depositors(&self) -> Vec<Address>;

    fn share_balance(&self, account: &Address) -> u128;

    fn total_supply(&self) -> u128;
}
