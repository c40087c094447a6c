//! Append-only log of typed ledger events.
//!
//! Every committed state change publishes one or more events. Off-process
//! consumers (oracle agents, dashboards) read the log by sequence number; the
//! ledger never knows who is listening.

use serde::{Deserialize, Serialize};

use crate::types::{AccountId, Amount, FlightStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum LedgerEvent {
    OperationalStatusChanged {
        operational: bool,
    },
    AirlineFunded {
        airline: AccountId,
        amount: Amount,
        refunded: Amount,
    },
    VotePlacedFor {
        candidate: AccountId,
        voter: AccountId,
        votes: u32,
        required: u32,
    },
    AirlineAdded {
        candidate: AccountId,
        sponsor: AccountId,
    },
    FlightRegistered {
        airline: AccountId,
        flight: String,
        available: bool,
    },
    InsurancePurchased {
        passenger: AccountId,
        airline: AccountId,
        flight: String,
        amount: Amount,
    },
    PassengerCredited {
        passenger: AccountId,
        airline: AccountId,
        flight: String,
        amount: Amount,
    },
    FundsWithdrawn {
        passenger: AccountId,
        airline: AccountId,
        flight: String,
        amount: Amount,
    },
    OracleRegistered {
        oracle: AccountId,
        indexes: [u8; 3],
    },
    StatusRequested {
        index: u8,
        airline: AccountId,
        flight: String,
        timestamp: u64,
    },
    OracleReport {
        oracle: AccountId,
        index: u8,
        airline: AccountId,
        flight: String,
        timestamp: u64,
        status: FlightStatus,
    },
    FlightStatusResolved {
        index: u8,
        airline: AccountId,
        flight: String,
        timestamp: u64,
        status: FlightStatus,
    },
}

impl LedgerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            LedgerEvent::OperationalStatusChanged { .. } => "OperationalStatusChanged",
            LedgerEvent::AirlineFunded { .. } => "AirlineFunded",
            LedgerEvent::VotePlacedFor { .. } => "VotePlacedFor",
            LedgerEvent::AirlineAdded { .. } => "AirlineAdded",
            LedgerEvent::FlightRegistered { .. } => "FlightRegistered",
            LedgerEvent::InsurancePurchased { .. } => "InsurancePurchased",
            LedgerEvent::PassengerCredited { .. } => "PassengerCredited",
            LedgerEvent::FundsWithdrawn { .. } => "FundsWithdrawn",
            LedgerEvent::OracleRegistered { .. } => "OracleRegistered",
            LedgerEvent::StatusRequested { .. } => "StatusRequested",
            LedgerEvent::OracleReport { .. } => "OracleReport",
            LedgerEvent::FlightStatusResolved { .. } => "FlightStatusResolved",
        }
    }
}

/// An event together with its position in the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub sequence: u64,
    #[serde(flatten)]
    pub event: LedgerEvent,
}

/// Sequence numbers start at 1 and increase by one per event.
#[derive(Debug, Default)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    pub(crate) fn publish(&mut self, event: LedgerEvent) -> u64 {
        let sequence = self.last_sequence() + 1;
        tracing::debug!(sequence, event = event.name(), "ledger event published");
        self.records.push(EventRecord { sequence, event });
        sequence
    }

    /// Sequence of the newest event, or 0 when the log is empty.
    pub fn last_sequence(&self) -> u64 {
        self.records.len() as u64
    }

    /// All events with a sequence strictly greater than `after`.
    pub fn since(&self, after: u64) -> &[EventRecord] {
        let start = usize::try_from(after)
            .unwrap_or(usize::MAX)
            .min(self.records.len());
        &self.records[start..]
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EventRecord> {
        self.records.iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn flight_registered(flight: &str) -> LedgerEvent {
        LedgerEvent::FlightRegistered {
            airline: AccountId::from("0xairline"),
            flight: flight.to_string(),
            available: true,
        }
    }

    #[test]
    fn test_sequences_are_contiguous() {
        let mut log = EventLog::default();
        assert_eq!(log.last_sequence(), 0);
        assert_eq!(log.publish(flight_registered("ND0303")), 1);
        assert_eq!(log.publish(flight_registered("ND1309")), 2);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_since_returns_only_newer_events() {
        let mut log = EventLog::default();
        log.publish(flight_registered("A1"));
        log.publish(flight_registered("A2"));
        log.publish(flight_registered("A3"));

        let newer: Vec<u64> = log.since(1).iter().map(|r| r.sequence).collect();
        assert_eq!(newer, vec![2, 3]);
        assert!(log.since(3).is_empty());
        assert!(log.since(99).is_empty());
        assert_eq!(log.since(0).len(), 3);
    }

    #[test]
    fn test_record_json_carries_event_name_and_sequence() {
        let record = EventRecord {
            sequence: 7,
            event: LedgerEvent::StatusRequested {
                index: 4,
                airline: AccountId::from("0xairline"),
                flight: "ND0303".to_string(),
                timestamp: 1_700_000_000,
            },
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["event"], "StatusRequested");
        assert_eq!(json["sequence"], 7);
        assert_eq!(json["index"], 4);
    }
}
