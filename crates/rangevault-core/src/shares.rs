//! # Share Ledger
//!
//! Fungible vault shares and the depositor registry used to fan out
//! rewards. Shares change only through deposit and withdrawal.

use std::collections::{BTreeSet, HashMap};

use crate::errors::{VaultError, VaultResult};
use crate::math::{mul_div, ratio, safe_add, safe_sub, Rounding};
use crate::types::Address;

/// Share balances, total supply and the set of current holders
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShareLedger {
    total_supply: u128,
    balances: HashMap<Address, u128>,
    depositors: BTreeSet<Address>,
}

impl ShareLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    pub fn balance_of(&self, account: &Address) -> u128 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Holders with a non-zero balance, in address order
    pub fn depositors(&self) -> Vec<Address> {
        self.depositors.iter().copied().collect()
    }

    pub fn is_depositor(&self, account: &Address) -> bool {
        self.depositors.contains(account)
    }

    /// Mint shares and register the holder
    pub fn mint(&mut self, to: &Address, shares: u128) -> VaultResult<()> {
        if shares == 0 {
            return Err(VaultError::InvalidInput("cannot mint zero shares".to_string()));
        }
        let supply = safe_add(self.total_supply, shares)?;
        let balance = safe_add(self.balance_of(to), shares)?;

        self.total_supply = supply;
        self.balances.insert(*to, balance);
        self.depositors.insert(*to);
        Ok(())
    }

    /// Burn shares, deregistering the holder at zero
    pub fn burn(&mut self, from: &Address, shares: u128) -> VaultResult<()> {
        let balance = self.balance_of(from);
        if balance == 0 || shares > balance {
            return Err(VaultError::NoBalance);
        }

        let remaining = balance - shares;
        self.total_supply = safe_sub(self.total_supply, shares)?;
        if remaining == 0 {
            self.balances.remove(from);
            self.depositors.remove(from);
        } else {
            self.balances.insert(*from, remaining);
        }
        Ok(())
    }

    // ========================================================================
    // Share Price Math
    // ========================================================================

    /// Shares for a deposit worth `value` into a vault worth `pre_value`
    pub fn shares_for_deposit(value: u128, supply: u128, pre_value: u128) -> VaultResult<u128> {
        if supply == 0 {
            return Ok(value);
        }
        if pre_value == 0 {
            return Err(VaultError::InvalidInput(
                "outstanding shares but the vault holds no value".to_string(),
            ));
        }
        Ok(mul_div(value, supply, pre_value, Rounding::Down)?)
    }

    /// Proportional slice of `balance` owned by `shares`
    pub fn assets_for_shares(balance: u128, shares: u128, supply: u128) -> VaultResult<u128> {
        if supply == 0 {
            return Ok(0);
        }
        Ok(mul_div(balance, shares, supply, Rounding::Down)?)
    }

    /// Value per share, PRECISION-scaled; zero with no supply
    pub fn share_price(total_value: u128, supply: u128) -> VaultResult<u128> {
        if supply == 0 {
            return Ok(0);
        }
        Ok(ratio(total_value, supply)?)
    }
}
