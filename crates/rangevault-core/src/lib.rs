//! # RangeVault Core
//!
//! Share-based vault engine for concentrated-liquidity AMM positions.
//!
//! The engine accepts a single base asset, splits it into the two leg
//! tokens of a main pool according to the active tick range, provides the
//! legs as liquidity and issues fungible shares for proportional ownership.
//! Harvested trading fees are converted back to the base asset and handed
//! to a [`RewardDistributor`] that credits depositors pro-rata.
//!
//! External systems (pools, price feed, token ledger, access control) are
//! consumed through the traits in [`interfaces`].

pub mod access;
pub mod balancer;
pub mod config;
pub mod constants;
pub mod engine;
pub mod errors;
pub mod interfaces;
pub mod oracle;
pub mod pool_price;
pub mod position;
pub mod reentrancy;
pub mod rewards;
pub mod shares;
pub mod swap_router;
pub mod types;

pub use rangevault_math as math;

pub use access::RoleRegistry;
pub use balancer::{BaseSplit, PlannedSwap, RangeBalancer};
pub use config::{DistributorConfig, FeeConfig, LimitConfig, Settings, VaultConfig};
pub use engine::{Collaborators, VaultEngine};
pub use errors::{VaultError, VaultResult};
pub use interfaces::{
    AccessControl, Clock, ConcentratedPool, MintCallback, PriceFeed, RewardSource, SwapCallback,
    SystemClock, TokenLedger,
};
pub use oracle::PriceOracleGuard;
pub use pool_price::{PoolPriceReader, PriceQuote};
pub use position::LiquidityPosition;
pub use reentrancy::{CallbackGuard, CallbackKind, OperationLock};
pub use rewards::{Distribution, RewardDistributor};
pub use shares::ShareLedger;
pub use swap_router::{Conversion, SwapRoute, SwapRouter};
pub use types::*;
