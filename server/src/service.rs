//! Ledger service layer - serialized access to the single ledger
//!
//! Every request runs as one transaction against the ledger while holding the
//! lock, so the ledger observes a single total order of calls. Events a
//! transaction commits are broadcast before the lock is released, which keeps
//! the live stream in sequence order.

use flight_surety_ledger::{EventRecord, Ledger, LedgerError};
use tokio::sync::Mutex;

use crate::websocket::WsState;

pub struct LedgerService {
    ledger: Mutex<Ledger>,
    ws_state: WsState,
}

impl LedgerService {
    pub fn new(ledger: Ledger, ws_state: WsState) -> Self {
        Self {
            ledger: Mutex::new(ledger),
            ws_state,
        }
    }

    pub fn ws_state(&self) -> &WsState {
        &self.ws_state
    }

    /// Run a mutating call and broadcast whatever events it committed.
    pub async fn transact<T, F>(&self, call: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&mut Ledger) -> Result<T, LedgerError>,
    {
        let mut ledger = self.ledger.lock().await;
        let before = ledger.events().last_sequence();

        let result = call(&mut ledger);

        for record in ledger.events().since(before) {
            self.ws_state.broadcast_event(record.clone());
        }
        result
    }

    pub async fn read<T, F>(&self, query: F) -> T
    where
        F: FnOnce(&Ledger) -> T,
    {
        let ledger = self.ledger.lock().await;
        query(&ledger)
    }

    /// Events after `after`, at most `limit` of them.
    pub async fn events_since(&self, after: u64, limit: usize) -> Vec<EventRecord> {
        self.read(|ledger| {
            ledger
                .events()
                .since(after)
                .iter()
                .take(limit)
                .cloned()
                .collect()
        })
        .await
    }
}
