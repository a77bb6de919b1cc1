//! # Vault Engine
//!
//! Composition root for a single vault. Orchestrates deposit, withdrawal,
//! position transitions and harvest over the share ledger, balancer,
//! position tracker and swap router.
//!
//! Every public mutating call runs under an [`OperationLock`] and against a
//! checkpoint of the engine-owned state; on error the checkpoint is
//! restored so the vault never keeps a partial update.

use tracing::{debug, info, warn};

use crate::balancer::RangeBalancer;
use crate::config::VaultConfig;
use crate::constants::{DUST_THRESHOLD, MAX_BPS, MAX_DEPOSIT_FEE_BPS};
use crate::errors::{VaultError, VaultResult};
use crate::interfaces::{
    AccessControl, Clock, ConcentratedPool, PriceFeed, RewardSource, TokenLedger,
};
use crate::math::{fraction_from_bps, mul_fraction, oracle_to_precision, ratio, safe_add, PRECISION};
use crate::oracle::PriceOracleGuard;
use crate::pool_price::{PoolPriceReader, PriceQuote};
use crate::position::LiquidityPosition;
use crate::reentrancy::OperationLock;
use crate::shares::ShareLedger;
use crate::swap_router::{Conversion, SwapRoute, SwapRouter};
use crate::types::{
    Address, Holdings, Leg, Role, TickRange, VaultSnapshot, VaultStatus, Withdrawal,
};

/// External systems a vault is wired to
pub struct Collaborators {
    pub ledger: Box<dyn TokenLedger>,
    pub main_pool: Box<dyn ConcentratedPool>,
    pub token0_route: Option<Box<dyn ConcentratedPool>>,
    pub token1_route: Option<Box<dyn ConcentratedPool>>,
    pub price_feed: Box<dyn PriceFeed>,
    pub clock: Box<dyn Clock>,
    pub access: Box<dyn AccessControl>,
}

/// Main pool plus the optional base-asset routes
struct Venues {
    main: Box<dyn ConcentratedPool>,
    token0_route: Option<SwapRoute>,
    token1_route: Option<SwapRoute>,
}

impl Venues {
    fn route(&self, leg: Leg) -> Option<&SwapRoute> {
        match leg {
            Leg::Token0 => self.token0_route.as_ref(),
            Leg::Token1 => self.token1_route.as_ref(),
        }
    }

    fn route_mut(&mut self, leg: Leg) -> Option<&mut SwapRoute> {
        match leg {
            Leg::Token0 => self.token0_route.as_mut(),
            Leg::Token1 => self.token1_route.as_mut(),
        }
    }

    /// Token pair of the configured pool at `address`
    fn tokens_of(&self, address: &Address) -> Option<(Address, Address)> {
        std::iter::once(self.main.as_ref())
            .chain(self.token0_route.iter().map(|route| route.pool.as_ref()))
            .chain(self.token1_route.iter().map(|route| route.pool.as_ref()))
            .find(|pool| pool.address() == *address)
            .map(|pool| (pool.token0(), pool.token1()))
    }
}

/// State owned by the vault and restored on failure
#[derive(Debug, Clone)]
struct VaultState {
    position: LiquidityPosition,
    shares: ShareLedger,
    /// Harvested base asset waiting for the reward distributor
    reward_escrow: u128,
}

/// Share-based liquidity vault
pub struct VaultEngine {
    config: VaultConfig,
    ledger: Box<dyn TokenLedger>,
    venues: Venues,
    oracle: PriceOracleGuard,
    access: Box<dyn AccessControl>,
    router: SwapRouter,
    state: VaultState,
    lock: OperationLock,
}

fn wire_route(
    name: &str,
    configured: Option<Address>,
    pool: Option<Box<dyn ConcentratedPool>>,
    base: &Address,
    leg: &Address,
) -> VaultResult<Option<SwapRoute>> {
    match (configured, pool) {
        (None, None) => Ok(None),
        (Some(expected), Some(pool)) => {
            if pool.address() != expected {
                return Err(VaultError::invalid_parameter(
                    name,
                    &pool.address().to_string(),
                    &expected.to_string(),
                ));
            }
            SwapRoute::new(pool, base, leg).map(Some)
        }
        (configured, _) => Err(VaultError::invalid_parameter(
            name,
            if configured.is_some() { "missing pool" } else { "unexpected pool" },
            "a pool exactly when the route is configured",
        )),
    }
}

impl VaultEngine {
    /// Wire a vault to its collaborators, validating that they match the config
    pub fn new(config: VaultConfig, collaborators: Collaborators) -> VaultResult<Self> {
        config.validate()?;

        let main = collaborators.main_pool;
        if main.address() != config.main_pool {
            return Err(VaultError::invalid_parameter(
                "main_pool",
                &main.address().to_string(),
                &config.main_pool.to_string(),
            ));
        }
        if main.token0() != config.token0 || main.token1() != config.token1 {
            return Err(VaultError::InvalidInput(format!(
                "main pool trades {}/{}, expected {}/{}",
                main.token0(),
                main.token1(),
                config.token0,
                config.token1
            )));
        }

        let token0_route = wire_route(
            "token0_route",
            config.token0_route,
            collaborators.token0_route,
            &config.base_token,
            &config.token0,
        )?;
        let token1_route = wire_route(
            "token1_route",
            config.token1_route,
            collaborators.token1_route,
            &config.base_token,
            &config.token1,
        )?;

        info!(
            "Vault {} wired at {} on pool {}",
            config.name, config.vault, config.main_pool
        );

        Ok(Self {
            router: SwapRouter::new(config.vault),
            state: VaultState {
                position: LiquidityPosition::new(config.vault),
                shares: ShareLedger::new(),
                reward_escrow: 0,
            },
            ledger: collaborators.ledger,
            venues: Venues {
                main,
                token0_route,
                token1_route,
            },
            oracle: PriceOracleGuard::new(collaborators.price_feed, collaborators.clock),
            access: collaborators.access,
            lock: OperationLock::default(),
            config,
        })
    }

    // ========================================================================
    // Views
    // ========================================================================

    pub fn address(&self) -> Address {
        self.config.vault
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    pub fn ledger(&self) -> &dyn TokenLedger {
        self.ledger.as_ref()
    }

    pub fn status(&self) -> VaultStatus {
        self.state.position.status()
    }

    pub fn tick_range(&self) -> TickRange {
        self.state.position.range()
    }

    pub fn total_supply(&self) -> u128 {
        self.state.shares.total_supply()
    }

    pub fn share_balance(&self, account: &Address) -> u128 {
        self.state.shares.balance_of(account)
    }

    pub fn depositors(&self) -> Vec<Address> {
        self.state.shares.depositors()
    }

    pub fn reward_escrow(&self) -> u128 {
        self.state.reward_escrow
    }

    /// Vault balances with the reward escrow excluded
    pub fn holdings(&self) -> Holdings {
        let base = if self.base_is_leg() {
            0
        } else {
            self.available(&self.config.base_token)
        };
        Holdings {
            amount0: self.available(&self.config.token0),
            amount1: self.available(&self.config.token1),
            base,
        }
    }

    /// Liquidity held at the active range
    pub fn position_liquidity(&self) -> u128 {
        self.state.position.liquidity(self.venues.main.as_ref())
    }

    /// Token amounts backing the position at the current pool price
    pub fn position_amounts(&self) -> VaultResult<(u128, u128)> {
        self.state.position.amounts(self.venues.main.as_ref())
    }

    /// Validated prices for the current step
    pub fn quote(&self) -> VaultResult<PriceQuote> {
        let reader = PoolPriceReader::new(self.venues.main.as_ref());
        let slot0 = reader.current_price_and_tick();
        let pool_price = reader.token_price_ratio()?;

        let base_price = if self.config.base_token == self.config.token1 {
            PRECISION
        } else {
            oracle_to_precision(self.oracle.latest_price()?)?
        };

        if self.config.base_token == self.config.token0 {
            self.check_price_deviation(base_price, pool_price)?;
        }

        Ok(PriceQuote {
            sqrt_price_x64: slot0.sqrt_price_x64,
            tick: slot0.tick,
            pool_price,
            base_price,
        })
    }

    /// Total vault value in token1-equivalent units
    pub fn total_value(&self) -> VaultResult<u128> {
        let quote = self.quote()?;
        self.value_at(&quote)
    }

    /// Value per share, PRECISION-scaled
    pub fn share_price(&self) -> VaultResult<u128> {
        ShareLedger::share_price(self.total_value()?, self.total_supply())
    }

    pub fn snapshot(&self) -> VaultResult<VaultSnapshot> {
        let total_value = self.total_value()?;
        let total_supply = self.total_supply();
        Ok(VaultSnapshot {
            vault: self.config.vault,
            status: self.status(),
            total_supply,
            depositors: self.state.shares.depositors().len(),
            holdings: self.holdings(),
            position_liquidity: self.position_liquidity(),
            reward_escrow: self.state.reward_escrow,
            total_value,
            share_price: ShareLedger::share_price(total_value, total_supply)?,
        })
    }

    // ========================================================================
    // Deposit and Withdrawal
    // ========================================================================

    /// Deposit base asset from `depositor` and mint shares to them
    pub fn deposit(&mut self, depositor: &Address, amount: u128) -> VaultResult<u128> {
        self.guarded("deposit", |vault| vault.deposit_inner(depositor, amount))
    }

    /// Redeem the depositor's entire share balance
    pub fn withdraw(&mut self, depositor: &Address) -> VaultResult<Withdrawal> {
        self.guarded("withdraw", |vault| vault.withdraw_inner(depositor))
    }

    fn deposit_inner(&mut self, depositor: &Address, amount: u128) -> VaultResult<u128> {
        if depositor.is_zero() {
            return Err(VaultError::invalid_parameter("depositor", "0x0", "non-zero address"));
        }
        let min_deposit = (self.config.limits.min_deposit as u128).max(1);
        if amount < min_deposit {
            return Err(VaultError::invalid_parameter(
                "amount",
                &amount.to_string(),
                &format!("at least {}", min_deposit),
            ));
        }

        // Prices are validated before any asset moves
        let quote = self.quote()?;
        let supply = self.state.shares.total_supply();
        let in_range = !self.state.position.is_flat();

        let (value, shares) = if in_range {
            self.harvest_inner()?;
            self.burn_position()?;
            let quote = self.quote()?;
            let pre_value = self.value_at(&quote)?;
            let net = self.pull_deposit(depositor, amount)?;
            let value = quote.base_value(net)?;
            self.redeploy()?;

            // Swap and mint rounding on the way in is borne by the depositor
            let post_value = self.value_at(&self.quote()?)?;
            let credited = value.min(post_value.saturating_sub(pre_value));
            (value, ShareLedger::shares_for_deposit(credited, supply, pre_value)?)
        } else {
            let pre_value = self.value_at(&quote)?;
            let net = self.pull_deposit(depositor, amount)?;
            let value = quote.base_value(net)?;
            (value, ShareLedger::shares_for_deposit(value, supply, pre_value)?)
        };

        if shares == 0 {
            return Err(VaultError::InvalidInput(format!(
                "deposit of {} is too small to mint shares",
                amount
            )));
        }
        self.state.shares.mint(depositor, shares)?;

        info!(
            "Deposit into {}: {} base from {} valued {} minted {} shares (supply {})",
            self.config.name,
            amount,
            depositor,
            value,
            shares,
            self.state.shares.total_supply()
        );
        Ok(shares)
    }

    fn withdraw_inner(&mut self, depositor: &Address) -> VaultResult<Withdrawal> {
        let shares = self.state.shares.balance_of(depositor);
        if shares == 0 {
            return Err(VaultError::NoBalance);
        }
        let supply = self.state.shares.total_supply();

        let withdrawal = if self.state.position.is_flat() {
            let withdrawal = Self::slice(&self.flat_holdings(), shares, supply)?;
            self.pay_withdrawal(depositor, &withdrawal)?;
            withdrawal
        } else {
            self.harvest_inner()?;
            self.burn_position()?;

            let withdrawal = Self::slice(&self.holdings(), shares, supply)?;
            self.pay_withdrawal(depositor, &withdrawal)?;

            if shares == supply {
                self.state.position.clear();
                info!("Last shares of {} withdrawn; vault is flat", self.config.name);
            } else {
                self.redeploy()?;
            }
            withdrawal
        };

        self.state.shares.burn(depositor, shares)?;

        info!(
            "Withdrawal from {}: {} shares by {} paid {:?}",
            self.config.name, shares, depositor, withdrawal
        );
        Ok(withdrawal)
    }

    /// Transfer the base deposit in and route the deposit fee; returns the net amount
    fn pull_deposit(&mut self, depositor: &Address, amount: u128) -> VaultResult<u128> {
        let base = self.config.base_token;
        let vault = self.config.vault;
        self.ledger.transfer(&base, depositor, &vault, amount)?;

        let fee = mul_fraction(amount, fraction_from_bps(self.config.fees.deposit_fee_bps))?;
        if fee > 0 {
            self.ledger
                .transfer(&base, &vault, &self.config.fees.fee_receiver, fee)?;
            debug!("Deposit fee {} sent to {}", fee, self.config.fees.fee_receiver);
        }
        Ok(amount - fee)
    }

    /// Proportional share of each holding owned by `shares`
    fn slice(holdings: &Holdings, shares: u128, supply: u128) -> VaultResult<Withdrawal> {
        Ok(Withdrawal {
            shares,
            amount0: ShareLedger::assets_for_shares(holdings.amount0, shares, supply)?,
            amount1: ShareLedger::assets_for_shares(holdings.amount1, shares, supply)?,
            base: ShareLedger::assets_for_shares(holdings.base, shares, supply)?,
        })
    }

    /// Shares are never burned for nothing
    fn pay_withdrawal(&mut self, depositor: &Address, withdrawal: &Withdrawal) -> VaultResult<()> {
        if withdrawal.amount0 == 0 && withdrawal.amount1 == 0 && withdrawal.base == 0 {
            return Err(VaultError::NoBalance);
        }
        let (token0, token1, base) =
            (self.config.token0, self.config.token1, self.config.base_token);
        self.pay_out(&token0, depositor, withdrawal.amount0)?;
        self.pay_out(&token1, depositor, withdrawal.amount1)?;
        self.pay_out(&base, depositor, withdrawal.base)
    }

    fn pay_out(&mut self, token: &Address, to: &Address, amount: u128) -> VaultResult<()> {
        if amount == 0 {
            return Ok(());
        }
        let vault = self.config.vault;
        self.ledger.transfer(token, &vault, to, amount)
    }

    // ========================================================================
    // Position Transitions
    // ========================================================================

    /// Flat to InRange: split the base balance into legs and mint
    pub fn open_position(&mut self, caller: &Address, lower: i32, upper: i32) -> VaultResult<u128> {
        self.guarded("open_position", |vault| {
            vault.require_role(Role::Manager, caller)?;
            if !vault.state.position.is_flat() {
                return Err(VaultError::InvalidInput("position is already open".to_string()));
            }
            let range = TickRange::new(lower, upper)?;
            // Leg tokens left by an earlier failed transition are deployed too
            let idle = vault.flat_holdings();
            if idle.base == 0 && idle.amount0 == 0 && idle.amount1 == 0 {
                return Err(VaultError::NoBalance);
            }
            let amount = idle.base;

            vault.harvest_inner()?;
            vault.state.position.set_range(range);
            vault.balance_base_amount(amount)?;
            vault.rebalance_legs()?;
            let liquidity = vault.mint_liquidity()?;

            info!(
                "Opened {} at [{}, {}] with {} base, liquidity {}",
                vault.config.name, lower, upper, amount, liquidity
            );
            Ok(liquidity)
        })
    }

    /// InRange to Flat: burn everything and convert both legs to base asset
    pub fn close_position(&mut self, caller: &Address) -> VaultResult<u128> {
        self.guarded("close_position", |vault| {
            vault.require_role(Role::Manager, caller)?;
            vault.require_in_range()?;

            vault.harvest_inner()?;
            vault.burn_position()?;
            let holdings = vault.holdings();
            vault.swap_leg_to_base(Leg::Token0, holdings.amount0)?;
            vault.swap_leg_to_base(Leg::Token1, holdings.amount1)?;
            vault.state.position.clear();

            let base = vault.flat_base();
            info!("Closed position of {}; holding {} base", vault.config.name, base);
            Ok(base)
        })
    }

    /// Move liquidity to new bounds
    pub fn update_position(&mut self, caller: &Address, lower: i32, upper: i32) -> VaultResult<u128> {
        self.guarded("update_position", |vault| {
            vault.require_role(Role::Manager, caller)?;
            vault.require_in_range()?;
            let range = TickRange::new(lower, upper)?;

            vault.harvest_inner()?;
            vault.burn_position()?;
            vault.state.position.set_range(range);
            let liquidity = vault.redeploy()?;

            info!(
                "Moved {} to [{}, {}], liquidity {}",
                vault.config.name, lower, upper, liquidity
            );
            Ok(liquidity)
        })
    }

    /// Compound idle leg tokens at the unchanged range; open to anyone
    pub fn re_add_liquidity(&mut self) -> VaultResult<u128> {
        self.guarded("re_add_liquidity", |vault| {
            vault.require_in_range()?;
            vault.harvest_inner()?;
            vault.redeploy()
        })
    }

    /// Collect fees, convert them to base asset and fill the reward escrow
    pub fn harvest(&mut self) -> VaultResult<u128> {
        self.guarded("harvest", |vault| vault.harvest_inner())
    }

    fn harvest_inner(&mut self) -> VaultResult<u128> {
        if self.state.position.is_flat() {
            return Ok(0);
        }

        let (fee0, fee1) = self
            .state
            .position
            .collect_fees(self.ledger.as_mut(), self.venues.main.as_mut())?;
        if fee0 == 0 && fee1 == 0 {
            return Ok(0);
        }

        let base0 = self.swap_leg_to_base(Leg::Token0, fee0)?;
        let base1 = self.swap_leg_to_base(Leg::Token1, fee1)?;
        let harvested = safe_add(base0, base1)?;

        let reward = mul_fraction(harvested, fraction_from_bps(self.config.fees.reward_bps))?;
        self.state.reward_escrow = safe_add(self.state.reward_escrow, reward)?;

        info!(
            "Harvested {} base from fees ({}, {}) on {}; {} to reward escrow",
            harvested, fee0, fee1, self.config.name, reward
        );
        Ok(harvested)
    }

    // ========================================================================
    // Rebalancing Steps
    // ========================================================================

    /// Split idle base into legs, rebalance, mint
    fn redeploy(&mut self) -> VaultResult<u128> {
        let idle = self.holdings().base;
        self.balance_base_amount(idle)?;
        self.rebalance_legs()?;
        self.mint_liquidity()
    }

    /// Swap a base-asset amount into both legs by the target fraction
    fn balance_base_amount(&mut self, amount: u128) -> VaultResult<()> {
        if amount == 0 {
            return Ok(());
        }

        let quote = self.quote()?;
        let holdings = self.holdings();
        let balancer = RangeBalancer::new(self.state.position.range(), &quote)?;
        let fraction = balancer.target_token0_fraction(holdings.amount0, holdings.amount1)?;
        let split = balancer.split_base_amount(amount, fraction)?;

        debug!(
            "Splitting {} base: {} to token0, {} to token1",
            amount, split.to_token0, split.to_token1
        );
        self.swap_base_to_leg(Leg::Token0, split.to_token0)?;
        self.swap_base_to_leg(Leg::Token1, split.to_token1)?;
        Ok(())
    }

    /// Single swap through the main pool toward the target split
    fn rebalance_legs(&mut self) -> VaultResult<()> {
        let quote = self.quote()?;
        let holdings = self.holdings();
        let balancer = RangeBalancer::new(self.state.position.range(), &quote)?;

        let plan = match balancer.rebalance_swap(holdings.amount0, holdings.amount1)? {
            Some(plan) if plan.amount_in > DUST_THRESHOLD => plan,
            _ => return Ok(()),
        };

        let conversion = if plan.zero_for_one {
            Conversion::Multiply(quote.pool_price)
        } else {
            Conversion::Divide(quote.pool_price)
        };
        let min_out = SwapRouter::min_amount_out(plan.amount_in, conversion, self.slippage())?;
        let received = self.router.swap(
            self.ledger.as_mut(),
            self.venues.main.as_mut(),
            plan.amount_in,
            min_out,
            plan.zero_for_one,
        )?;

        info!(
            "Rebalanced {}: sold {} {} for {}",
            self.config.name,
            plan.amount_in,
            if plan.zero_for_one { "token0" } else { "token1" },
            received
        );
        Ok(())
    }

    fn mint_liquidity(&mut self) -> VaultResult<u128> {
        let holdings = self.holdings();
        self.state.position.mint(
            self.ledger.as_mut(),
            self.venues.main.as_mut(),
            holdings.amount0,
            holdings.amount1,
        )
    }

    fn burn_position(&mut self) -> VaultResult<(u128, u128)> {
        self.state
            .position
            .burn_all(self.ledger.as_mut(), self.venues.main.as_mut())
    }

    fn swap_base_to_leg(&mut self, leg: Leg, amount: u128) -> VaultResult<u128> {
        let Some(zero_for_one) = self.venues.route(leg).map(SwapRoute::base_to_leg) else {
            return Ok(amount);
        };
        if amount == 0 {
            return Ok(0);
        }

        let quote = self.quote()?;
        let conversion = Conversion::Divide(quote.leg_price_in_base(leg)?);
        let min_out = SwapRouter::min_amount_out(amount, conversion, self.slippage())?;
        self.router.swap_route(
            self.ledger.as_mut(),
            self.venues.route_mut(leg),
            amount,
            min_out,
            zero_for_one,
        )
    }

    fn swap_leg_to_base(&mut self, leg: Leg, amount: u128) -> VaultResult<u128> {
        let Some(zero_for_one) = self.venues.route(leg).map(SwapRoute::leg_to_base) else {
            return Ok(amount);
        };
        if amount == 0 {
            return Ok(0);
        }

        let quote = self.quote()?;
        let conversion = Conversion::Multiply(quote.leg_price_in_base(leg)?);
        let min_out = SwapRouter::min_amount_out(amount, conversion, self.slippage())?;
        self.router.swap_route(
            self.ledger.as_mut(),
            self.venues.route_mut(leg),
            amount,
            min_out,
            zero_for_one,
        )
    }

    // ========================================================================
    // Pool Callbacks
    // ========================================================================

    /// Mint settlement entry point; rejected unless a mint is in flight
    pub fn mint_callback(&mut self, caller: &Address, owed0: u128, owed1: u128) -> VaultResult<()> {
        let (token0, token1) = (self.config.token0, self.config.token1);
        self.state
            .position
            .settle_mint(self.ledger.as_mut(), caller, token0, token1, owed0, owed1)
    }

    /// Swap settlement entry point; rejected unless a swap is in flight
    pub fn swap_callback(
        &mut self,
        caller: &Address,
        amount0_delta: i128,
        amount1_delta: i128,
    ) -> VaultResult<()> {
        let (token0, token1) = self
            .venues
            .tokens_of(caller)
            .unwrap_or((self.config.token0, self.config.token1));
        self.router.settle_swap(
            self.ledger.as_mut(),
            caller,
            token0,
            token1,
            amount0_delta,
            amount1_delta,
        )
    }

    // ========================================================================
    // Administration
    // ========================================================================

    /// Set the deposit fee; at most 10%
    pub fn set_deposit_fee(&mut self, caller: &Address, fee_bps: u32) -> VaultResult<()> {
        self.require_role(Role::Admin, caller)?;
        if fee_bps > MAX_DEPOSIT_FEE_BPS {
            return Err(VaultError::invalid_parameter(
                "deposit_fee_bps",
                &fee_bps.to_string(),
                &format!("at most {} (10%)", MAX_DEPOSIT_FEE_BPS),
            ));
        }
        self.config.fees.deposit_fee_bps = fee_bps;
        info!("Deposit fee of {} set to {} bps", self.config.name, fee_bps);
        Ok(())
    }

    pub fn set_slippage(&mut self, caller: &Address, slippage_bps: u32) -> VaultResult<()> {
        self.require_role(Role::Admin, caller)?;
        if slippage_bps > MAX_BPS {
            return Err(VaultError::invalid_parameter(
                "slippage_bps",
                &slippage_bps.to_string(),
                &format!("at most {}", MAX_BPS),
            ));
        }
        self.config.limits.slippage_bps = slippage_bps;
        info!("Slippage of {} set to {} bps", self.config.name, slippage_bps);
        Ok(())
    }

    pub fn set_min_deposit(&mut self, caller: &Address, min_deposit: u64) -> VaultResult<()> {
        self.require_role(Role::Admin, caller)?;
        self.config.limits.min_deposit = min_deposit;
        info!("Minimum deposit of {} set to {}", self.config.name, min_deposit);
        Ok(())
    }

    pub fn set_fee_receiver(&mut self, caller: &Address, receiver: Address) -> VaultResult<()> {
        self.require_role(Role::Admin, caller)?;
        if receiver.is_zero() {
            return Err(VaultError::invalid_parameter("fee_receiver", "0x0", "non-zero address"));
        }
        self.config.fees.fee_receiver = receiver;
        info!("Fee receiver of {} set to {}", self.config.name, receiver);
        Ok(())
    }

    /// Set the reward receiver and the share of harvests routed to it
    pub fn set_reward_settings(
        &mut self,
        caller: &Address,
        receiver: Address,
        reward_bps: u32,
    ) -> VaultResult<()> {
        self.require_role(Role::Admin, caller)?;
        if receiver.is_zero() {
            return Err(VaultError::invalid_parameter("reward_receiver", "0x0", "non-zero address"));
        }
        if reward_bps > MAX_BPS {
            return Err(VaultError::invalid_parameter(
                "reward_bps",
                &reward_bps.to_string(),
                &format!("at most {}", MAX_BPS),
            ));
        }
        self.config.fees.reward_receiver = receiver;
        self.config.fees.reward_bps = reward_bps;
        info!(
            "Rewards of {} routed to {} at {} bps",
            self.config.name, receiver, reward_bps
        );
        Ok(())
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Run `operation` under the lock, restoring engine state on error
    fn guarded<T>(
        &mut self,
        operation: &str,
        f: impl FnOnce(&mut Self) -> VaultResult<T>,
    ) -> VaultResult<T> {
        self.lock.acquire()?;
        let checkpoint = self.state.clone();

        let result = f(self);
        if let Err(err) = &result {
            warn!("{} on {} failed: {}", operation, self.config.name, err);
            self.state = checkpoint;
        }

        self.lock.release();
        result
    }

    fn require_role(&self, role: Role, caller: &Address) -> VaultResult<()> {
        if self.access.has_role(role, caller) {
            Ok(())
        } else {
            warn!("{} lacks {:?} on {}", caller, role, self.config.name);
            Err(VaultError::CallerNotAuthorized(*caller))
        }
    }

    fn require_in_range(&self) -> VaultResult<()> {
        if self.state.position.is_flat() {
            return Err(VaultError::InvalidInput("no open position".to_string()));
        }
        Ok(())
    }

    fn base_is_leg(&self) -> bool {
        self.config.base_token == self.config.token0 || self.config.base_token == self.config.token1
    }

    /// Vault balance of `token`, minus the reward escrow for the base asset
    fn available(&self, token: &Address) -> u128 {
        let balance = self.ledger.balance_of(token, &self.config.vault);
        if *token == self.config.base_token {
            balance.saturating_sub(self.state.reward_escrow)
        } else {
            balance
        }
    }

    fn flat_base(&self) -> u128 {
        self.available(&self.config.base_token)
    }

    /// Holdings with a leg that is the base asset reported as base
    fn flat_holdings(&self) -> Holdings {
        let mut holdings = self.holdings();
        if self.config.base_token == self.config.token0 {
            holdings.base = std::mem::take(&mut holdings.amount0);
        } else if self.config.base_token == self.config.token1 {
            holdings.base = std::mem::take(&mut holdings.amount1);
        }
        holdings
    }

    fn slippage(&self) -> u128 {
        fraction_from_bps(self.config.limits.slippage_bps)
    }

    fn value_at(&self, quote: &PriceQuote) -> VaultResult<u128> {
        if self.state.position.is_flat() {
            let idle = self.flat_holdings();
            return quote.value_in_token1(idle.amount0, idle.amount1, idle.base);
        }
        let holdings = self.holdings();
        let (position0, position1) = self.position_amounts()?;
        quote.value_in_token1(
            safe_add(holdings.amount0, position0)?,
            safe_add(holdings.amount1, position1)?,
            holdings.base,
        )
    }

    /// Oracle and pool quote the same pair when the base asset is token0
    fn check_price_deviation(&self, base_price: u128, pool_price: u128) -> VaultResult<()> {
        if pool_price == 0 {
            return Err(VaultError::StaleOrInvalidPrice("pool price rounds to zero".to_string()));
        }
        let deviation = ratio(base_price.abs_diff(pool_price), pool_price)?;
        let limit = fraction_from_bps(self.config.limits.max_price_deviation_bps);
        if deviation > limit {
            warn!(
                "Oracle price {} deviates from pool price {} on {}",
                base_price, pool_price, self.config.name
            );
            return Err(VaultError::StaleOrInvalidPrice(format!(
                "oracle deviates {} from pool (limit {})",
                deviation, limit
            )));
        }
        Ok(())
    }
}

impl RewardSource for VaultEngine {
    fn vault_address(&self) -> Address {
        self.config.vault
    }

    fn release_rewards(&mut self, caller: &Address) -> VaultResult<u128> {
        self.guarded("release_rewards", |vault| {
            if *caller != vault.config.fees.reward_receiver {
                return Err(VaultError::CallerNotAuthorized(*caller));
            }
            let amount = vault.state.reward_escrow;
            if amount == 0 {
                return Err(VaultError::NoBalance);
            }

            let (base, from) = (vault.config.base_token, vault.config.vault);
            vault.ledger.transfer(&base, &from, caller, amount)?;
            vault.state.reward_escrow = 0;

            info!("Released {} reward escrow of {} to {}", amount, vault.config.name, caller);
            Ok(amount)
        })
    }

    fn depositors(&self) -> Vec<Address> {
        self.state.shares.depositors()
    }

    fn share_balance(&self, account: &Address) -> u128 {
        self.state.shares.balance_of(account)
    }

    fn total_supply(&self) -> u128 {
        self.state.shares.total_supply()
    }
}
