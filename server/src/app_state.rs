//! State handed to every route: the ledger service, its event broadcaster and
//! the moment the server came up.

use std::sync::Arc;

use axum::extract::FromRef;
use chrono::{DateTime, Utc};

use crate::service::LedgerService;
use crate::websocket::WsState;

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<LedgerService>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(ledger: Arc<LedgerService>) -> Self {
        Self {
            ledger,
            started_at: Utc::now(),
        }
    }

    /// Whole seconds since the state was built, never negative.
    pub fn uptime_seconds(&self, now: DateTime<Utc>) -> u64 {
        u64::try_from((now - self.started_at).num_seconds()).unwrap_or(0)
    }
}

// The broadcaster lives on the service so transactions and sockets share one
// channel.
impl FromRef<AppState> for WsState {
    fn from_ref(state: &AppState) -> Self {
        state.ledger.ws_state().clone()
    }
}

impl FromRef<AppState> for Arc<LedgerService> {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.ledger)
    }
}
