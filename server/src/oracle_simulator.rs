//! In-process oracle agents for local runs.
//!
//! The simulator registers a pool of oracles at startup, then listens to the
//! live event stream. Every `StatusRequested` event is answered by each
//! simulated oracle holding the requested index, with a random status code.

use std::sync::Arc;

use flight_surety_ledger::{
    AccountId, EventRecord, FlightStatus, LedgerError, LedgerEvent, ResponseOutcome,
    ORACLE_REGISTRATION_FEE,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::service::LedgerService;

#[derive(Debug, Error)]
pub enum SimulatorError {
    #[error("failed to register simulated oracle {oracle}: {source}")]
    Registration {
        oracle: AccountId,
        #[source]
        source: LedgerError,
    },
}

#[derive(Debug, Clone)]
struct SimulatedOracle {
    id: AccountId,
    indexes: [u8; 3],
}

pub struct OracleSimulator {
    service: Arc<LedgerService>,
    oracles: Vec<SimulatedOracle>,
    events: broadcast::Receiver<EventRecord>,
    rng: StdRng,
}

impl OracleSimulator {
    /// Register `count` oracles, reusing any already registered under the same
    /// identities.
    pub async fn register(
        service: Arc<LedgerService>,
        count: usize,
    ) -> Result<Self, SimulatorError> {
        let mut oracles = Vec::with_capacity(count);
        for n in 0..count {
            let id = AccountId::new(format!("0xsimulated-oracle-{n}"));
            let indexes = service
                .transact(|ledger| match ledger.my_indexes(&id) {
                    Ok(indexes) => Ok(indexes),
                    Err(_) => ledger.register_oracle(&id, ORACLE_REGISTRATION_FEE),
                })
                .await
                .map_err(|source| SimulatorError::Registration {
                    oracle: id.clone(),
                    source,
                })?;
            oracles.push(SimulatedOracle { id, indexes });
        }

        info!(count = oracles.len(), "simulated oracles registered");
        let events = service.ws_state().subscribe();
        Ok(Self {
            service,
            oracles,
            events,
            rng: StdRng::from_entropy(),
        })
    }

    pub fn oracle_count(&self) -> usize {
        self.oracles.len()
    }

    /// Answer status requests until the event stream closes. Requests made
    /// after [`OracleSimulator::register`] returned are never missed.
    pub async fn run(mut self) -> Result<(), SimulatorError> {
        info!(oracles = self.oracles.len(), "oracle simulator started");

        loop {
            match self.events.recv().await {
                Ok(record) => {
                    if let LedgerEvent::StatusRequested {
                        index,
                        airline,
                        flight,
                        timestamp,
                    } = record.event
                    {
                        self.answer(index, &airline, &flight, timestamp).await;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "oracle simulator lagged behind the event stream");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    info!("event stream closed; oracle simulator stopping");
                    return Ok(());
                }
            }
        }
    }

    async fn answer(&mut self, index: u8, airline: &AccountId, flight: &str, timestamp: u64) {
        let responders: Vec<_> = self
            .oracles
            .iter()
            .filter(|oracle| oracle.indexes.contains(&index))
            .cloned()
            .collect();
        debug!(index, %airline, flight, responders = responders.len(), "answering status request");

        for oracle in responders {
            let status = *FlightStatus::ALL
                .choose(&mut self.rng)
                .unwrap_or(&FlightStatus::Unknown);
            let result = self
                .service
                .transact(|ledger| {
                    ledger.submit_oracle_response(&oracle.id, index, airline, flight, timestamp, status)
                })
                .await;

            match result {
                Ok(ResponseOutcome::Resolved { status }) => {
                    info!(%airline, flight, timestamp, %status, "simulated oracles resolved flight");
                }
                Ok(outcome) => debug!(oracle = %oracle.id, ?outcome, "simulated oracle responded"),
                Err(e) => warn!(oracle = %oracle.id, error = %e, "simulated oracle response rejected"),
            }
        }
    }
}
