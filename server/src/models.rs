//! Request and response bodies for the FlightSurety API.
//!
//! Callers identify themselves with `from`, and payments travel as `value` in
//! smallest currency units.

use flight_surety_ledger::{
    Airline, Amount, ErrorKind, Flight, InsurancePolicy, LedgerSummary, OracleRequest,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            error_kind: None,
        }
    }

    pub fn failure(error: impl Into<String>, error_kind: Option<ErrorKind>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            error_kind,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct SetOperationalRequest {
    #[validate(length(min = 1))]
    pub from: String,
    pub operational: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct FundAirlineRequest {
    #[validate(length(min = 1))]
    pub from: String,
    pub value: Amount,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterAirlineRequest {
    #[validate(length(min = 1))]
    pub from: String,
    #[validate(length(min = 1))]
    pub airline: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterFlightRequest {
    #[validate(length(min = 1))]
    pub from: String,
    #[validate(length(min = 1, max = 32))]
    pub flight: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct FetchFlightStatusRequest {
    #[validate(length(min = 1))]
    pub from: String,
    #[validate(length(min = 1))]
    pub airline: String,
    #[validate(length(min = 1))]
    pub flight: String,
    /// Defaults to the current time in seconds.
    pub timestamp: Option<u64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterOracleRequest {
    #[validate(length(min = 1))]
    pub from: String,
    pub value: Amount,
}

#[derive(Debug, Deserialize, Validate)]
pub struct OracleResponseRequest {
    #[validate(length(min = 1))]
    pub from: String,
    pub index: u8,
    #[validate(length(min = 1))]
    pub airline: String,
    #[validate(length(min = 1))]
    pub flight: String,
    pub timestamp: u64,
    /// Wire status code: 0, 10, 20, 30, 40 or 50.
    pub status: u8,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BuyInsuranceRequest {
    #[validate(length(min = 1))]
    pub from: String,
    #[validate(length(min = 1))]
    pub airline: String,
    #[validate(length(min = 1))]
    pub flight: String,
    pub value: Amount,
}

#[derive(Debug, Deserialize, Validate)]
pub struct WithdrawRequest {
    #[validate(length(min = 1))]
    pub from: String,
    #[validate(length(min = 1))]
    pub airline: String,
    #[validate(length(min = 1))]
    pub flight: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct EventsQuery {
    pub after: Option<u64>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OperationalStatus {
    pub operational: bool,
}

#[derive(Debug, Serialize)]
pub struct AirlineView {
    #[serde(flatten)]
    pub airline: Airline,
    pub votes_required: usize,
}

#[derive(Debug, Serialize)]
pub struct FlightView {
    #[serde(flatten)]
    pub flight: Flight,
    pub requests: Vec<OracleRequest>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OracleIndexes {
    pub oracle: String,
    pub indexes: [u8; 3],
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Withdrawal {
    pub passenger: String,
    pub amount: Amount,
}

#[derive(Debug, Serialize)]
pub struct PassengerBalance {
    pub passenger: String,
    pub airline: String,
    pub flight: String,
    pub balance: Amount,
    pub policy: Option<InsurancePolicy>,
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub time: chrono::DateTime<chrono::Utc>,
    pub uptime_seconds: u64,
    pub ledger: LedgerSummary,
}
