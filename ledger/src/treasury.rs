//! Custody of funds held by the ledger.
//!
//! Payments attached to calls are deposited here; withdrawals leave through
//! [`Treasury::transfer`]. The ledger always updates its own books before it
//! asks the treasury to move money out.

use std::collections::HashMap;
use std::fmt::Debug;

use thiserror::Error;

use crate::types::{AccountId, Amount};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    #[error("insufficient custody: requested {requested}, available {available}")]
    InsufficientCustody { requested: Amount, available: Amount },
    #[error("recipient {0} rejected the transfer")]
    Rejected(AccountId),
}

/// Outbound side of the ledger's money flow.
pub trait Treasury: Debug + Send {
    /// Take custody of a payment attached to a call.
    fn deposit(&mut self, from: &AccountId, amount: Amount);

    /// Move `amount` out of custody to `to`.
    fn transfer(&mut self, to: &AccountId, amount: Amount) -> Result<(), TransferError>;

    /// Funds currently held.
    fn custody(&self) -> Amount;

    /// Total ever transferred to `account`.
    fn paid_to(&self, account: &AccountId) -> Amount;
}

/// Treasury that keeps custody and payouts in memory.
#[derive(Debug, Default)]
pub struct InMemoryTreasury {
    custody: Amount,
    paid_out: HashMap<AccountId, Amount>,
}

impl InMemoryTreasury {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Treasury for InMemoryTreasury {
    fn deposit(&mut self, from: &AccountId, amount: Amount) {
        self.custody = self.custody.saturating_add(amount);
        tracing::debug!(%from, amount, custody = self.custody, "treasury deposit");
    }

    fn transfer(&mut self, to: &AccountId, amount: Amount) -> Result<(), TransferError> {
        if amount > self.custody {
            return Err(TransferError::InsufficientCustody {
                requested: amount,
                available: self.custody,
            });
        }
        self.custody -= amount;
        let total = self.paid_out.entry(to.clone()).or_insert(0);
        *total = total.saturating_add(amount);
        tracing::debug!(%to, amount, custody = self.custody, "treasury transfer");
        Ok(())
    }

    fn custody(&self) -> Amount {
        self.custody
    }

    fn paid_to(&self, account: &AccountId) -> Amount {
        self.paid_out.get(account).copied().unwrap_or(0)
    }
}
