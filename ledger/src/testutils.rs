//! Shared fixtures for unit tests.

use crate::config::LedgerConfig;
use crate::ledger::Ledger;
use crate::types::{AccountId, Amount, FlightKey, ONE_ETHER};
use crate::AIRLINE_REGISTRATION_FEE;

pub const OWNER: &str = "0xowner";
pub const GENESIS: &str = "0xairline0";

pub fn acct(id: &str) -> AccountId {
    AccountId::from(id)
}

pub fn airline(n: usize) -> AccountId {
    AccountId::new(format!("0xairline{n}"))
}

pub fn ether(n: i128) -> Amount {
    n * ONE_ETHER
}

pub fn setup() -> Ledger {
    Ledger::new(LedgerConfig::new(OWNER, GENESIS).with_nonce([42u8; 32]))
}

/// Ledger whose genesis airline has paid its fee.
pub fn setup_funded() -> Ledger {
    let mut ledger = setup();
    ledger
        .fund(&acct(GENESIS), AIRLINE_REGISTRATION_FEE)
        .unwrap();
    ledger
}

/// Funded genesis airline with flight `ND0303` registered.
pub fn setup_with_flight() -> (Ledger, FlightKey) {
    let mut ledger = setup_funded();
    let key = ledger.register_flight(&acct(GENESIS), "ND0303").unwrap();
    (ledger, key)
}

/// Admits airlines 1..=3 through the bootstrap phase, bringing the count to four.
pub fn setup_four_airlines() -> Ledger {
    let mut ledger = setup_funded();
    for n in 1..=3 {
        ledger.register_airline(&acct(GENESIS), &airline(n)).unwrap();
    }
    ledger
}
