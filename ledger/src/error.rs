//! Ledger error taxonomy.
//!
//! Every failure carries a stable numeric code and a human-readable reason, and
//! belongs to one of five kinds callers can branch on.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::treasury::TransferError;

/// Coarse classification of a [`LedgerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Caller lacks the required role, funding or registration.
    Authorization,
    /// The ledger is in a state that forbids the operation.
    State,
    /// Wrong or insufficient payment, or an invalid argument.
    Value,
    /// A record with the same key already exists.
    Conflict,
    /// The referenced record does not exist.
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Caller is not contract owner")]
    NotOwner = 1,
    #[error("Contract is currently not operational")]
    NotOperational = 2,
    #[error("You must pay registration fee to do that")]
    NotFunded = 3,
    #[error("Caller is not a registered airline")]
    AirlineNotRegistered = 4,
    #[error("Airline is already registered")]
    AirlineAlreadyRegistered = 5,
    #[error("Airline has already paid its registration fee")]
    AlreadyFunded = 6,
    #[error("Airline has already voted for this candidate")]
    DuplicateVote = 7,
    #[error("Registration fee requires at least 10 ether")]
    InsufficientFunding = 8,
    #[error("Flight code must not be empty")]
    InvalidFlightCode = 9,
    #[error("Flight is already registered")]
    FlightAlreadyRegistered = 10,
    #[error("Flight is not registered")]
    FlightNotFound = 11,
    #[error("Insurance amount must be greater than zero")]
    InvalidAmount = 12,
    #[error("Insurance amount exceeds the premium cap")]
    PremiumCapExceeded = 13,
    #[error("Flight status has already been reported")]
    FlightAlreadySettled = 14,
    #[error("Policy has already been credited")]
    PolicyAlreadyCredited = 15,
    #[error("No funds available to withdraw")]
    NothingToWithdraw = 16,
    #[error("Oracle registration fee must be paid exactly")]
    WrongOracleFee = 17,
    #[error("Oracle is already registered")]
    OracleAlreadyRegistered = 18,
    #[error("Caller is not a registered oracle")]
    OracleNotRegistered = 19,
    #[error("A status request with this key already exists")]
    DuplicateRequest = 20,
    #[error("Unknown flight status code")]
    UnknownStatusCode = 21,
    #[error("Account identity must not be empty")]
    InvalidAccount = 22,
    #[error("Amount overflow")]
    AmountOverflow = 23,
    #[error("Treasury transfer failed")]
    TransferFailed = 24,
    #[error("Ledger reserves cannot cover the payout for this policy")]
    InsufficientReserves = 25,
}

impl LedgerError {
    pub fn code(&self) -> u32 {
        *self as u32
    }

    pub fn kind(&self) -> ErrorKind {
        use LedgerError::*;
        match self {
            NotOwner | NotFunded | AirlineNotRegistered | OracleNotRegistered => {
                ErrorKind::Authorization
            }
            NotOperational | AirlineAlreadyRegistered | AlreadyFunded | DuplicateVote
            | FlightAlreadySettled | PolicyAlreadyCredited | TransferFailed | InsufficientReserves => {
                ErrorKind::State
            }
            InsufficientFunding | InvalidFlightCode | InvalidAmount | PremiumCapExceeded
            | NothingToWithdraw | WrongOracleFee | UnknownStatusCode | InvalidAccount
            | AmountOverflow => ErrorKind::Value,
            FlightAlreadyRegistered | OracleAlreadyRegistered | DuplicateRequest => {
                ErrorKind::Conflict
            }
            FlightNotFound => ErrorKind::NotFound,
        }
    }
}

impl From<TransferError> for LedgerError {
    fn from(_: TransferError) -> Self {
        LedgerError::TransferFailed
    }
}
