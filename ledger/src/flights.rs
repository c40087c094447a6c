//! Flight catalog: registered flights and the latest resolved status.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::events::LedgerEvent;
use crate::ledger::Ledger;
use crate::types::{AccountId, FlightKey, FlightStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flight {
    pub airline: AccountId,
    pub flight: String,
    pub available: bool,
    pub status: FlightStatus,
    /// Timestamp of the request whose resolution set `status`.
    pub status_timestamp: Option<u64>,
}

impl Flight {
    /// Oracles have resolved a status for this flight.
    pub fn is_settled(&self) -> bool {
        self.status_timestamp.is_some()
    }
}

#[derive(Debug, Default)]
pub struct FlightCatalog {
    flights: HashMap<FlightKey, Flight>,
    order: Vec<FlightKey>,
}

impl FlightCatalog {
    pub fn get(&self, key: &FlightKey) -> Option<&Flight> {
        self.flights.get(key)
    }

    pub fn contains(&self, key: &FlightKey) -> bool {
        self.flights.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Keys in registration order.
    pub fn keys(&self) -> &[FlightKey] {
        &self.order
    }

    /// Flights in registration order.
    pub fn all(&self) -> Vec<&Flight> {
        self.order
            .iter()
            .filter_map(|key| self.flights.get(key))
            .collect()
    }

    fn insert(&mut self, key: FlightKey) -> Result<&Flight, LedgerError> {
        if self.flights.contains_key(&key) {
            return Err(LedgerError::FlightAlreadyRegistered);
        }
        let flight = Flight {
            airline: key.airline.clone(),
            flight: key.flight.clone(),
            available: true,
            status: FlightStatus::Unknown,
            status_timestamp: None,
        };
        self.order.push(key.clone());
        Ok(self.flights.entry(key).or_insert(flight))
    }

    /// Written only by oracle resolution, once per flight. Returns false when
    /// the flight is unknown or already settled.
    pub(crate) fn record_status(
        &mut self,
        key: &FlightKey,
        status: FlightStatus,
        timestamp: u64,
    ) -> bool {
        match self.flights.get_mut(key) {
            Some(flight) if !flight.is_settled() => {
                flight.status = status;
                flight.status_timestamp = Some(timestamp);
                true
            }
            _ => false,
        }
    }
}

impl Ledger {
    /// Register a flight operated by `airline`, which must have paid its fee.
    pub fn register_flight(
        &mut self,
        airline: &AccountId,
        flight: &str,
    ) -> Result<FlightKey, LedgerError> {
        self.gate.require_operational()?;
        if !self.airlines.is_funded(airline) {
            tracing::warn!(%airline, flight, "unfunded airline tried to register a flight");
            return Err(LedgerError::NotFunded);
        }

        let code = flight.trim();
        if code.is_empty() {
            return Err(LedgerError::InvalidFlightCode);
        }

        let key = FlightKey::new(airline.clone(), code);
        let available = self.flights.insert(key.clone())?.available;

        tracing::info!(%airline, flight = code, "flight registered");
        self.publish(LedgerEvent::FlightRegistered {
            airline: airline.clone(),
            flight: code.to_string(),
            available,
        });
        Ok(key)
    }

    /// Flight codes of every registered flight, in registration order.
    pub fn flight_list(&self) -> Vec<String> {
        self.flights
            .keys()
            .iter()
            .map(|key| key.flight.clone())
            .collect()
    }

    pub fn flight(&self, key: &FlightKey) -> Option<&Flight> {
        self.flights.get(key)
    }
}
