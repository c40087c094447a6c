//! Route definitions for the FlightSurety API

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;
use crate::handlers::*;
use crate::websocket::ws_handler;

// Operational gate routes
pub fn operational_routes() -> Router<AppState> {
    Router::new().route("/api/operational", get(get_operational).post(set_operational))
}

// Airline routes
pub fn airline_routes() -> Router<AppState> {
    Router::new()
        .route("/api/airlines", post(register_airline))
        .route("/api/airlines/fund", post(fund_airline))
        .route("/api/airlines/:id", get(get_airline))
}

// Flight routes
pub fn flight_routes() -> Router<AppState> {
    Router::new()
        .route("/api/flights", get(list_flights).post(register_flight))
        .route("/api/flights/:airline/:flight", get(get_flight))
}

// Oracle routes
pub fn oracle_routes() -> Router<AppState> {
    Router::new()
        .route("/api/oracles", post(register_oracle))
        .route("/api/oracles/:id/indexes", get(get_oracle_indexes))
        .route("/api/oracle/requests", post(fetch_flight_status))
        .route("/api/oracle/responses", post(submit_oracle_response))
}

// Insurance routes
pub fn insurance_routes() -> Router<AppState> {
    Router::new()
        .route("/api/insurance", post(buy_insurance))
        .route("/api/insurance/withdraw", post(withdraw))
        .route(
            "/api/insurance/:passenger/:airline/:flight",
            get(get_balance),
        )
}

// Event log and live stream
pub fn event_routes() -> Router<AppState> {
    Router::new()
        .route("/api/events", get(list_events))
        .route("/ws", get(ws_handler))
}

/// Every route with request tracing, bound to `state`.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .merge(operational_routes())
        .merge(airline_routes())
        .merge(flight_routes())
        .merge(oracle_routes())
        .merge(insurance_routes())
        .merge(event_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
