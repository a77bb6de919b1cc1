//! # Role Registry
//!
//! In-memory [`AccessControl`] implementation. Role administration itself
//! happens outside the engine; the registry is configured before it is
//! handed to a vault.

use std::collections::{HashMap, HashSet};

use crate::interfaces::AccessControl;
use crate::types::{Address, Role};

/// Role grants keyed by role
#[derive(Debug, Clone, Default)]
pub struct RoleRegistry {
    grants: HashMap<Role, HashSet<Address>>,
}

impl RoleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with one account holding both roles
    pub fn with_owner(owner: Address) -> Self {
        let mut registry = Self::new();
        registry.grant(Role::Admin, owner);
        registry.grant(Role::Manager, owner);
        registry
    }

    pub fn grant(&mut self, role: Role, account: Address) {
        self.grants.entry(role).or_default().insert(account);
    }

    pub fn revoke(&mut self, role: Role, account: &Address) -> bool {
        self.grants
            .get_mut(&role)
            .map(|accounts| accounts.remove(account))
            .unwrap_or(false)
    }
}

impl AccessControl for RoleRegistry {
    fn has_role(&self, role: Role, account: &Address) -> bool {
        self.grants
            .get(&role)
            .map(|accounts| accounts.contains(account))
            .unwrap_or(false)
    }
}
