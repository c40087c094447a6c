//! Operational gate: the owner-controlled circuit breaker in front of every
//! mutating entry point.

use crate::error::LedgerError;
use crate::events::LedgerEvent;
use crate::ledger::Ledger;
use crate::types::AccountId;

#[derive(Debug, Clone)]
pub struct OperationalGate {
    owner: AccountId,
    operational: bool,
}

impl OperationalGate {
    pub fn new(owner: AccountId) -> Self {
        Self {
            owner,
            operational: true,
        }
    }

    pub fn owner(&self) -> &AccountId {
        &self.owner
    }

    pub fn is_operational(&self) -> bool {
        self.operational
    }

    pub fn require_operational(&self) -> Result<(), LedgerError> {
        if !self.operational {
            return Err(LedgerError::NotOperational);
        }
        Ok(())
    }

    fn require_owner(&self, caller: &AccountId) -> Result<(), LedgerError> {
        if *caller != self.owner {
            return Err(LedgerError::NotOwner);
        }
        Ok(())
    }
}

impl Ledger {
    pub fn is_operational(&self) -> bool {
        self.gate.is_operational()
    }

    pub fn owner(&self) -> &AccountId {
        self.gate.owner()
    }

    /// Open or close the gate (owner only). Not itself gated, so a closed
    /// ledger can be reopened.
    pub fn set_operating_status(
        &mut self,
        caller: &AccountId,
        operational: bool,
    ) -> Result<(), LedgerError> {
        if let Err(err) = self.gate.require_owner(caller) {
            tracing::warn!(%caller, "rejected operating status change from non-owner");
            return Err(err);
        }

        if self.gate.operational == operational {
            tracing::debug!(operational, "operating status unchanged");
            return Ok(());
        }

        self.gate.operational = operational;
        tracing::info!(operational, "operating status changed");
        self.publish(LedgerEvent::OperationalStatusChanged { operational });
        Ok(())
    }
}
