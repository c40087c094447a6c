//! Identities, amounts and keys shared by every ledger component.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Currency amount in smallest units.
pub type Amount = i128;

/// One whole coin expressed in smallest units (18 decimals).
pub const ONE_ETHER: Amount = 1_000_000_000_000_000_000;

/// Opaque identity of a caller: an airline, a passenger, an oracle or the owner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for AccountId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Flight status codes as reported by oracles.
///
/// The numeric values are part of the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum FlightStatus {
    Unknown = 0,
    OnTime = 10,
    LateAirline = 20,
    LateWeather = 30,
    LateTechnical = 40,
    LateOther = 50,
}

impl FlightStatus {
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Only a delay caused by the airline triggers an insurance payout.
    pub const fn pays_out(self) -> bool {
        matches!(self, FlightStatus::LateAirline)
    }

    pub const ALL: [FlightStatus; 6] = [
        FlightStatus::Unknown,
        FlightStatus::OnTime,
        FlightStatus::LateAirline,
        FlightStatus::LateWeather,
        FlightStatus::LateTechnical,
        FlightStatus::LateOther,
    ];
}

impl TryFrom<u8> for FlightStatus {
    type Error = LedgerError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(FlightStatus::Unknown),
            10 => Ok(FlightStatus::OnTime),
            20 => Ok(FlightStatus::LateAirline),
            30 => Ok(FlightStatus::LateWeather),
            40 => Ok(FlightStatus::LateTechnical),
            50 => Ok(FlightStatus::LateOther),
            _ => Err(LedgerError::UnknownStatusCode),
        }
    }
}

impl From<FlightStatus> for u8 {
    fn from(status: FlightStatus) -> Self {
        status.code()
    }
}

impl fmt::Display for FlightStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlightStatus::Unknown => "unknown",
            FlightStatus::OnTime => "on_time",
            FlightStatus::LateAirline => "late_airline",
            FlightStatus::LateWeather => "late_weather",
            FlightStatus::LateTechnical => "late_technical",
            FlightStatus::LateOther => "late_other",
        };
        f.write_str(name)
    }
}

/// A flight is identified by its operating airline and flight code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FlightKey {
    pub airline: AccountId,
    pub flight: String,
}

impl FlightKey {
    pub fn new(airline: impl Into<AccountId>, flight: impl Into<String>) -> Self {
        Self {
            airline: airline.into(),
            flight: flight.into(),
        }
    }
}

impl fmt::Display for FlightKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.airline, self.flight)
    }
}

/// Key of an oracle status request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestKey {
    pub index: u8,
    pub airline: AccountId,
    pub flight: String,
    pub timestamp: u64,
}

impl RequestKey {
    pub fn new(index: u8, flight: &FlightKey, timestamp: u64) -> Self {
        Self {
            index,
            airline: flight.airline.clone(),
            flight: flight.flight.clone(),
            timestamp,
        }
    }

    pub fn flight_key(&self) -> FlightKey {
        FlightKey::new(self.airline.clone(), self.flight.clone())
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}@{}#{}",
            self.airline, self.flight, self.timestamp, self.index
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_status_codes_round_trip_through_wire_values() {
        for status in FlightStatus::ALL {
            assert_eq!(FlightStatus::try_from(status.code()), Ok(status));
        }
        assert_eq!(
            FlightStatus::try_from(21),
            Err(LedgerError::UnknownStatusCode)
        );
    }

    #[test]
    fn test_status_serializes_as_number() {
        let json = serde_json::to_string(&FlightStatus::LateAirline).unwrap();
        assert_eq!(json, "20");
        assert!(serde_json::from_str::<FlightStatus>("7").is_err());
    }

    #[test]
    fn test_only_late_airline_pays_out() {
        let paying: Vec<_> = FlightStatus::ALL
            .into_iter()
            .filter(|s| s.pays_out())
            .collect();
        assert_eq!(paying, vec![FlightStatus::LateAirline]);
    }
}
