//! In-memory token ledger shared between the vault, pools and tests

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use rangevault_core::{Address, TokenLedger, VaultError, VaultResult};

/// Cloneable handle over one set of balances
#[derive(Clone, Default)]
pub struct SharedLedger {
    balances: Rc<RefCell<HashMap<(Address, Address), u128>>>,
}

impl SharedLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `amount` of `token` out of thin air
    pub fn mint(&self, token: &Address, owner: &Address, amount: u128) {
        *self.balances.borrow_mut().entry((*token, *owner)).or_insert(0) += amount;
    }

    pub fn balance(&self, token: &Address, owner: &Address) -> u128 {
        self.balances
            .borrow()
            .get(&(*token, *owner))
            .copied()
            .unwrap_or(0)
    }
}

impl TokenLedger for SharedLedger {
    fn balance_of(&self, token: &Address, owner: &Address) -> u128 {
        self.balance(token, owner)
    }

    fn transfer(
        &mut self,
        token: &Address,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> VaultResult<()> {
        let mut balances = self.balances.borrow_mut();
        let available = balances.get(&(*token, *from)).copied().unwrap_or(0);
        if available < amount {
            return Err(VaultError::transfer_failed(token, from, to, amount));
        }
        balances.insert((*token, *from), available - amount);
        *balances.entry((*token, *to)).or_insert(0) += amount;
        Ok(())
    }
}
