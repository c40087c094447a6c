//! Ledger configuration fixed at initialization.

use crate::types::{AccountId, Amount};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Identity allowed to open and close the operational gate.
    pub owner: AccountId,
    /// Airline registered when the ledger is created.
    pub genesis_airline: AccountId,
    /// Upper bound on the total premium one passenger may pay for one flight.
    pub max_premium: Option<Amount>,
    /// Refuse purchases whose worst-case payout custody could not cover.
    pub reserve_check: bool,
    /// Opaque process nonce mixed into oracle index generation.
    pub nonce: [u8; 32],
}

impl LedgerConfig {
    pub fn new(owner: impl Into<AccountId>, genesis_airline: impl Into<AccountId>) -> Self {
        Self {
            owner: owner.into(),
            genesis_airline: genesis_airline.into(),
            max_premium: None,
            reserve_check: false,
            nonce: [0u8; 32],
        }
    }

    pub fn with_max_premium(mut self, cap: Amount) -> Self {
        self.max_premium = Some(cap);
        self
    }

    pub fn with_reserve_check(mut self) -> Self {
        self.reserve_check = true;
        self
    }

    pub fn with_nonce(mut self, nonce: [u8; 32]) -> Self {
        self.nonce = nonce;
        self
    }
}
