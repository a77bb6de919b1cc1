//! Vault fixture wiring the in-memory doubles together

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use rangevault_core::{
    Address, Clock, Collaborators, ConcentratedPool, DistributorConfig, PriceFeed,
    RewardDistributor, Role, RoleRegistry, RoundData, VaultConfig, VaultEngine, VaultResult,
};

use super::{init_test_tracing, MockPool, SharedLedger};

pub const START_TIME: u64 = 1_700_000_000;
pub const MANAGER: Address = Address([0x3a; 20]);
pub const ADMIN: Address = Address([0xad; 20]);

/// Liquidity each pool starts with, per token
const POOL_RESERVES: u128 = 1_000_000_000_000_000_000_000_000_000_000;

/// Block clock the test can advance
#[derive(Clone)]
pub struct MockClock(Rc<Cell<u64>>);

impl MockClock {
    pub fn new(now: u64) -> Self {
        Self(Rc::new(Cell::new(now)))
    }

    pub fn set(&self, now: u64) {
        self.0.set(now);
    }

    pub fn advance(&self, secs: u64) {
        self.0.set(self.0.get() + secs);
    }
}

impl Clock for MockClock {
    fn now(&self) -> u64 {
        self.0.get()
    }
}

/// Price feed with an adjustable latest round
#[derive(Clone)]
pub struct MockFeed(Rc<RefCell<RoundData>>);

impl MockFeed {
    pub fn new(answer: i128, updated_at: u64) -> Self {
        Self(Rc::new(RefCell::new(RoundData {
            round_id: 1,
            answer,
            started_at: updated_at,
            updated_at,
            answered_in_round: 1,
        })))
    }

    /// Publish a new round
    pub fn set_price(&self, answer: i128, updated_at: u64) {
        let mut round = self.0.borrow_mut();
        round.round_id += 1;
        round.answered_in_round = round.round_id;
        round.answer = answer;
        round.started_at = updated_at;
        round.updated_at = updated_at;
    }
}

impl PriceFeed for MockFeed {
    fn latest_round_data(&self) -> VaultResult<RoundData> {
        Ok(*self.0.borrow())
    }
}

/// A vault wired to a shared ledger, constant-price pools and a mock oracle
pub struct Fixture {
    pub vault: VaultEngine,
    pub config: VaultConfig,
    pub ledger: SharedLedger,
    pub main_pool: MockPool,
    pub token0_route: Option<MockPool>,
    pub token1_route: Option<MockPool>,
    pub feed: MockFeed,
    pub clock: MockClock,
}

impl Fixture {
    /// Distinct base, token0 and token1, all priced 1:1
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Base asset doubles as token1; no token1 route and no oracle dependency
    pub fn base_is_token1() -> Self {
        Self::with_config(|config| {
            config.token1 = config.base_token;
            config.token1_route = None;
        })
    }

    /// Base asset doubles as token0; the oracle is reconciled against the pool
    pub fn base_is_token0() -> Self {
        Self::with_config(|config| {
            config.token0 = config.base_token;
            config.token0_route = None;
        })
    }

    pub fn with_config(adjust: impl FnOnce(&mut VaultConfig)) -> Self {
        init_test_tracing();

        let mut config = VaultConfig::default();
        config.limits.min_deposit = 1_000;
        adjust(&mut config);

        let ledger = SharedLedger::new();
        let main_pool = MockPool::new(config.main_pool, config.token0, config.token1, 0);
        // The two routes list the base asset on opposite sides
        let token0_route = config
            .token0_route
            .map(|address| MockPool::new(address, config.base_token, config.token0, 0));
        let token1_route = config
            .token1_route
            .map(|address| MockPool::new(address, config.token1, config.base_token, 0));

        for pool in std::iter::once(&main_pool)
            .chain(token0_route.iter())
            .chain(token1_route.iter())
        {
            ledger.mint(&pool.token0(), &pool.address(), POOL_RESERVES);
            ledger.mint(&pool.token1(), &pool.address(), POOL_RESERVES);
        }

        let feed = MockFeed::new(100_000_000, START_TIME);
        let clock = MockClock::new(START_TIME);

        let mut access = RoleRegistry::new();
        access.grant(Role::Manager, MANAGER);
        access.grant(Role::Admin, ADMIN);

        let collaborators = Collaborators {
            ledger: Box::new(ledger.clone()),
            main_pool: Box::new(main_pool.clone()),
            token0_route: token0_route
                .clone()
                .map(|pool| Box::new(pool) as Box<dyn ConcentratedPool>),
            token1_route: token1_route
                .clone()
                .map(|pool| Box::new(pool) as Box<dyn ConcentratedPool>),
            price_feed: Box::new(feed.clone()),
            clock: Box::new(clock.clone()),
            access: Box::new(access),
        };

        let vault = VaultEngine::new(config.clone(), collaborators).expect("fixture vault wires");

        Self {
            vault,
            config,
            ledger,
            main_pool,
            token0_route,
            token1_route,
            feed,
            clock,
        }
    }

    /// Move the main pool to `tick` and reprice the token0 route to match
    ///
    /// Assumes the oracle keeps the base asset at one token1.
    pub fn set_pool_tick(&self, tick: i32) {
        self.main_pool.set_tick(tick);
        if let Some(route) = &self.token0_route {
            // The route quotes token0 per base asset
            route.set_tick(-tick);
        }
    }

    /// Distributor sharing this fixture's ledger
    pub fn distributor(&self) -> RewardDistributor {
        let config = DistributorConfig {
            address: self.config.fees.reward_receiver,
            base_token: self.config.base_token,
            ..DistributorConfig::default()
        };
        RewardDistributor::new(config, Box::new(self.ledger.clone())).expect("distributor config")
    }

    /// Give `account` base asset to deposit
    pub fn fund(&self, account: &Address, amount: u128) {
        self.ledger.mint(&self.config.base_token, account, amount);
    }

    /// Fund and deposit in one step
    pub fn deposit(&mut self, account: &Address, amount: u128) -> VaultResult<u128> {
        self.fund(account, amount);
        self.vault.deposit(account, amount)
    }

    pub fn base_balance(&self, account: &Address) -> u128 {
        self.ledger.balance(&self.config.base_token, account)
    }

    pub fn token0_balance(&self, account: &Address) -> u128 {
        self.ledger.balance(&self.config.token0, account)
    }

    pub fn token1_balance(&self, account: &Address) -> u128 {
        self.ledger.balance(&self.config.token1, account)
    }

    /// Accrue trading fees to the vault's position in the main pool
    pub fn accrue_fees(&self, fee0: u128, fee1: u128) {
        self.main_pool.accrue_fees(&self.config.vault, fee0, fee1);
    }
}
