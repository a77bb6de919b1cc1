//! # Price Oracle Guard
//!
//! Wraps the external price feed. Every price-dependent step calls
//! [`PriceOracleGuard::latest_price`]; no answer is cached between calls.

use tracing::warn;

use crate::constants::ORACLE_STALENESS_WINDOW_SECS;
use crate::errors::{VaultError, VaultResult};
use crate::interfaces::{Clock, PriceFeed};

/// Staleness and sign checks around a price feed
pub struct PriceOracleGuard {
    feed: Box<dyn PriceFeed>,
    clock: Box<dyn Clock>,
    max_age_secs: u64,
}

impl PriceOracleGuard {
    pub fn new(feed: Box<dyn PriceFeed>, clock: Box<dyn Clock>) -> Self {
        Self {
            feed,
            clock,
            max_age_secs: ORACLE_STALENESS_WINDOW_SECS,
        }
    }

    /// Current block time from the clock collaborator
    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    /// Latest 8-decimal answer, rejected if non-positive, stale or from the future
    pub fn latest_price(&self) -> VaultResult<u128> {
        let round = self.feed.latest_round_data()?;
        let now = self.clock.now();

        if round.answer <= 0 {
            warn!("Rejected non-positive oracle answer {} (round {})", round.answer, round.round_id);
            return Err(VaultError::StaleOrInvalidPrice(format!(
                "non-positive answer {}",
                round.answer
            )));
        }

        if round.updated_at > now {
            warn!("Rejected oracle update from the future: {} > {}", round.updated_at, now);
            return Err(VaultError::StaleOrInvalidPrice(format!(
                "updated_at {} is after current time {}",
                round.updated_at, now
            )));
        }

        let age = now - round.updated_at;
        if age > self.max_age_secs {
            warn!(
                "Rejected stale oracle answer: age {}s exceeds {}s",
                age, self.max_age_secs
            );
            return Err(VaultError::StaleOrInvalidPrice(format!(
                "answer is {}s old (max {}s)",
                age, self.max_age_secs
            )));
        }

        Ok(round.answer as u128)
    }
}
