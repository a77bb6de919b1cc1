/// Reentrancy protection for top-level operations and pool callbacks.
/// Top-level calls hold an [`OperationLock`] for their whole duration.
/// Pool settlement callbacks follow a two-phase protocol on a
/// [`CallbackGuard`]: open a critical section naming the pool, make the
/// external call, consume exactly one callback from that pool, finish.
/// Callbacks outside an open section are rejected.

use tracing::warn;

use crate::errors::{VaultError, VaultResult};
use crate::types::Address;

// ============================================================================
// Operation Lock
// ============================================================================

/// Reentrancy guard status flags
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReentrancyStatus {
    /// Ready for operations
    #[default]
    Unlocked,
    /// An operation is in progress
    Locked,
}

/// Lock held for the duration of a top-level operation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OperationLock {
    status: ReentrancyStatus,
}

impl OperationLock {
    /// Acquire lock for an operation
    pub fn acquire(&mut self) -> VaultResult<()> {
        match self.status {
            ReentrancyStatus::Unlocked => {
                self.status = ReentrancyStatus::Locked;
                Ok(())
            }
            ReentrancyStatus::Locked => Err(VaultError::ReentrancyDetected),
        }
    }

    /// Release lock after the operation completes
    pub fn release(&mut self) {
        if self.status == ReentrancyStatus::Unlocked {
            warn!("Releasing an operation lock that is not held");
        }
        self.status = ReentrancyStatus::Unlocked;
    }

    pub fn is_locked(&self) -> bool {
        self.status == ReentrancyStatus::Locked
    }
}

// ============================================================================
// Callback Guard
// ============================================================================

/// Kind of pool callback a critical section expects
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallbackKind {
    Swap,
    Mint,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum CallbackState {
    #[default]
    Idle,
    Open { kind: CallbackKind, pool: Address },
    Consumed { kind: CallbackKind },
}

/// Single-flag guard for pool settlement callbacks
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CallbackGuard {
    state: CallbackState,
}

impl CallbackGuard {
    /// Open a critical section expecting one `kind` callback from `pool`
    pub fn begin(&mut self, kind: CallbackKind, pool: Address) -> VaultResult<()> {
        match self.state {
            CallbackState::Idle => {
                self.state = CallbackState::Open { kind, pool };
                Ok(())
            }
            _ => Err(VaultError::ReentrancyDetected),
        }
    }

    /// Accept the callback if it is the one the open section expects
    pub fn consume(&mut self, kind: CallbackKind, caller: &Address) -> VaultResult<()> {
        match self.state {
            CallbackState::Open { kind: expected, pool } if expected == kind && pool == *caller => {
                self.state = CallbackState::Consumed { kind };
                Ok(())
            }
            state => {
                warn!(
                    "Rejected {:?} callback from {} (guard state {:?})",
                    kind, caller, state
                );
                Err(VaultError::CallerNotAuthorized(*caller))
            }
        }
    }

    /// Close the critical section; returns whether the callback arrived
    pub fn finish(&mut self) -> bool {
        let consumed = matches!(self.state, CallbackState::Consumed { .. });
        self.state = CallbackState::Idle;
        consumed
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, CallbackState::Open { .. })
    }
}
