//! The single store that owns every ledger record.
//!
//! Components hold their own records; the entry points that coordinate them
//! live in `impl Ledger` blocks inside each component module. A `Ledger` is
//! created once at startup with the genesis airline and lives for the whole
//! process.

use serde::Serialize;

use crate::airlines::AirlineRegistry;
use crate::config::LedgerConfig;
use crate::events::{EventLog, LedgerEvent};
use crate::flights::FlightCatalog;
use crate::gate::OperationalGate;
use crate::insurance::EscrowLedger;
use crate::oracles::OracleConsensus;
use crate::rng::IndexGenerator;
use crate::treasury::{InMemoryTreasury, Treasury};
use crate::types::Amount;

#[derive(Debug)]
pub struct Ledger {
    pub(crate) config: LedgerConfig,
    pub(crate) gate: OperationalGate,
    pub(crate) airlines: AirlineRegistry,
    pub(crate) flights: FlightCatalog,
    pub(crate) escrow: EscrowLedger,
    pub(crate) oracles: OracleConsensus,
    pub(crate) events: EventLog,
    pub(crate) treasury: Box<dyn Treasury>,
    pub(crate) indexes: IndexGenerator,
}

/// Point-in-time counters for dashboards and health checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerSummary {
    pub operational: bool,
    pub registered_airlines: usize,
    pub funded_airlines: usize,
    pub flights: usize,
    pub oracles: usize,
    pub open_requests: usize,
    pub custody: Amount,
    pub outstanding_balances: Amount,
    pub last_event: u64,
}

impl Ledger {
    pub fn new(config: LedgerConfig) -> Self {
        Self::with_treasury(config, Box::new(InMemoryTreasury::new()))
    }

    pub fn with_treasury(config: LedgerConfig, treasury: Box<dyn Treasury>) -> Self {
        tracing::info!(
            owner = %config.owner,
            genesis_airline = %config.genesis_airline,
            max_premium = ?config.max_premium,
            "initializing ledger"
        );

        Self {
            gate: OperationalGate::new(config.owner.clone()),
            airlines: AirlineRegistry::with_genesis(config.genesis_airline.clone()),
            flights: FlightCatalog::default(),
            escrow: EscrowLedger::default(),
            oracles: OracleConsensus::default(),
            events: EventLog::default(),
            indexes: IndexGenerator::new(config.nonce),
            treasury,
            config,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn treasury(&self) -> &dyn Treasury {
        self.treasury.as_ref()
    }

    pub fn airlines(&self) -> &AirlineRegistry {
        &self.airlines
    }

    pub fn flights(&self) -> &FlightCatalog {
        &self.flights
    }

    pub fn escrow(&self) -> &EscrowLedger {
        &self.escrow
    }

    pub fn oracles(&self) -> &OracleConsensus {
        &self.oracles
    }

    pub fn summary(&self) -> LedgerSummary {
        LedgerSummary {
            operational: self.gate.is_operational(),
            registered_airlines: self.airlines.registered_count(),
            funded_airlines: self.airlines.funded_count(),
            flights: self.flights.len(),
            oracles: self.oracles.oracle_count(),
            open_requests: self.oracles.open_request_count(),
            custody: self.treasury.custody(),
            outstanding_balances: self.escrow.outstanding(),
            last_event: self.events.last_sequence(),
        }
    }

    pub(crate) fn publish(&mut self, event: LedgerEvent) {
        self.events.publish(event);
    }
}
