//! FlightSurety Ledger
//!
//! The authoritative state machine behind flight-delay insurance. Airlines are
//! admitted by multi-party vote and pay a registration fee, passengers buy
//! insurance held in escrow, and a quorum of oracles resolves flight status.
//! A resolution of `LateAirline` credits every insured passenger 1.5x their
//! premium, which they withdraw on demand.
//!
//! All state lives in a single [`Ledger`]. Every mutating entry point checks the
//! operational gate first and either commits completely or returns a
//! [`LedgerError`] without touching state.

pub mod airlines;
pub mod config;
pub mod error;
pub mod events;
pub mod flights;
pub mod gate;
pub mod insurance;
pub mod ledger;
pub mod oracles;
pub mod rng;
pub mod treasury;
pub mod types;

#[cfg(test)]
pub(crate) mod testutils;

pub use airlines::{Airline, RegistrationOutcome, AIRLINE_REGISTRATION_FEE, MULTIPARTY_THRESHOLD};
pub use config::LedgerConfig;
pub use error::{ErrorKind, LedgerError};
pub use events::{EventLog, EventRecord, LedgerEvent};
pub use flights::Flight;
pub use insurance::InsurancePolicy;
pub use ledger::{Ledger, LedgerSummary};
pub use oracles::{
    IgnoreReason, Oracle, OracleRequest, ResponseOutcome, MIN_RESPONSES, ORACLE_REGISTRATION_FEE,
};
pub use rng::ORACLE_INDEX_RANGE;
pub use treasury::{InMemoryTreasury, TransferError, Treasury};
pub use types::{AccountId, Amount, FlightKey, FlightStatus, RequestKey, ONE_ETHER};
