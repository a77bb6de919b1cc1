//! # Reward Distributor
//!
//! Pulls a vault's reward escrow and splits it between a fixed receiver
//! and the vault's current depositors. Depositor portions are credited as
//! claimable balances keyed by (vault, user) and paid out on claim.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::config::DistributorConfig;
use crate::errors::{VaultError, VaultResult};
use crate::interfaces::{RewardSource, TokenLedger};
use crate::math::{fraction_from_bps, mul_div, mul_fraction, safe_add, safe_sub, Rounding};
use crate::reentrancy::OperationLock;
use crate::types::Address;

/// Outcome of one distribution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Distribution {
    pub vault: Address,
    /// Amount pulled from the vault's escrow
    pub total: u128,
    /// Fixed cut plus rounding dust, transferred to the receiver
    pub to_receiver: u128,
    /// Sum credited to depositors
    pub to_depositors: u128,
    /// Per-depositor credits of this distribution
    pub recipients: Vec<(Address, u128)>,
}

/// Ledger of claimable rewards across vaults
pub struct RewardDistributor {
    config: DistributorConfig,
    ledger: Box<dyn TokenLedger>,
    claimable: HashMap<(Address, Address), u128>,
    lock: OperationLock,
}

impl RewardDistributor {
    pub fn new(config: DistributorConfig, ledger: Box<dyn TokenLedger>) -> VaultResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ledger,
            claimable: HashMap::new(),
            lock: OperationLock::default(),
        })
    }

    pub fn address(&self) -> Address {
        self.config.address
    }

    /// Pending rewards of `user` in `vault`
    pub fn claimable(&self, vault: &Address, user: &Address) -> u128 {
        self.claimable.get(&(*vault, *user)).copied().unwrap_or(0)
    }

    /// Pull the vault's escrow and split it; fails with `NoBalance` when empty
    pub fn distribute(&mut self, vault: &mut dyn RewardSource) -> VaultResult<Distribution> {
        self.lock.acquire()?;
        let result = self.distribute_inner(vault);
        self.lock.release();
        result
    }

    /// Pay out and zero the caller's own claimable balance in `vault`
    pub fn claim(&mut self, caller: &Address, vault: &Address) -> VaultResult<u128> {
        self.lock.acquire()?;
        let result = self.claim_inner(caller, vault);
        self.lock.release();
        result
    }

    fn distribute_inner(&mut self, vault: &mut dyn RewardSource) -> VaultResult<Distribution> {
        let vault_address = vault.vault_address();
        let (token, me) = (self.config.base_token, self.config.address);

        let before = self.ledger.balance_of(&token, &me);
        let released = vault.release_rewards(&me)?;
        let received = self.ledger.balance_of(&token, &me).saturating_sub(before);
        if received < released {
            return Err(VaultError::TransferFailed(format!(
                "vault {} released {} but distributor received {}",
                vault_address, released, received
            )));
        }

        let receiver_cut = mul_fraction(released, fraction_from_bps(self.config.receiver_bps))?;
        let pool = safe_sub(released, receiver_cut)?;

        // Depositor set and balances are read once, at distribution time
        let supply = vault.total_supply();
        let mut recipients = Vec::new();
        let mut credits = HashMap::new();
        let mut to_depositors = 0u128;
        if supply > 0 {
            for depositor in vault.depositors() {
                let share = mul_div(pool, vault.share_balance(&depositor), supply, Rounding::Down)?;
                if share == 0 {
                    continue;
                }
                let credited = safe_add(self.claimable(&vault_address, &depositor), share)?;
                credits.insert((vault_address, depositor), credited);
                to_depositors = safe_add(to_depositors, share)?;
                recipients.push((depositor, share));
            }
        }

        let to_receiver = safe_sub(released, to_depositors)?;
        if to_receiver > 0 {
            let receiver = self.config.receiver;
            self.ledger.transfer(&token, &me, &receiver, to_receiver)?;
        }

        // Credits land only once every transfer has gone through
        self.claimable.extend(credits);

        info!(
            "Distributed {} from vault {}: {} to receiver, {} across {} depositors",
            released,
            vault_address,
            to_receiver,
            to_depositors,
            recipients.len()
        );

        Ok(Distribution {
            vault: vault_address,
            total: released,
            to_receiver,
            to_depositors,
            recipients,
        })
    }

    fn claim_inner(&mut self, caller: &Address, vault: &Address) -> VaultResult<u128> {
        let amount = self.claimable(vault, caller);
        if amount == 0 {
            return Err(VaultError::NoClaimable);
        }

        let (token, me) = (self.config.base_token, self.config.address);
        self.ledger.transfer(&token, &me, caller, amount)?;
        self.claimable.remove(&(*vault, *caller));

        debug!("{} claimed {} from vault {}", caller, amount, vault);
        Ok(amount)
    }
}
