//! FlightSurety Backend Server
//!
//! Serves the flight-delay insurance ledger over HTTP: airline admission and
//! funding, flight registration, passenger insurance, oracle status reports
//! and a live event stream for off-process oracle agents.

use std::sync::Arc;

use anyhow::Context;
use axum::http::{header, HeaderValue, Method};
use flight_surety_ledger::Ledger;
use flight_surety_server::app_state::AppState;
use flight_surety_server::config::AppConfig;
use flight_surety_server::oracle_simulator::OracleSimulator;
use flight_surety_server::routes;
use flight_surety_server::service::LedgerService;
use flight_surety_server::websocket::WsState;
use tokio::time::{sleep, Duration};
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const SIMULATOR_SUPERVISOR_MAX_BACKOFF_SECONDS: u64 = 30;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env().context("Failed to load configuration")?;

    let ledger = Ledger::new(config.ledger_config());
    let ws_state = WsState::new(config.event_buffer_size);
    let service = Arc::new(LedgerService::new(ledger, ws_state));

    if config.simulated_oracles > 0 {
        spawn_oracle_simulator(service.clone(), config.simulated_oracles);
    }

    let app = routes::build_router(AppState::new(service)).layer(build_cors_layer(&config));

    let addr = config.bind_addr();
    info!("Server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

/// Start and supervise the oracle simulator, restarting it with backoff if it
/// fails or panics.
fn spawn_oracle_simulator(service: Arc<LedgerService>, count: usize) {
    tokio::spawn(async move {
        let mut restart_count: u32 = 0;
        loop {
            let service = service.clone();
            let handle = tokio::spawn(async move {
                let simulator = OracleSimulator::register(service, count).await?;
                simulator.run().await
            });

            match handle.await {
                Ok(Ok(())) => {
                    info!("oracle simulator exited cleanly; stopping supervisor");
                    break;
                }
                Ok(Err(e)) => {
                    error!(error = %e, "oracle simulator failed; restarting");
                }
                Err(join_error) => {
                    if join_error.is_panic() {
                        error!("oracle simulator panicked; restarting");
                    } else {
                        error!(error = %join_error, "oracle simulator task failed; restarting");
                    }
                }
            }

            restart_count = restart_count.saturating_add(1);
            let backoff_seconds = (2u64.saturating_pow(restart_count.min(5)))
                .min(SIMULATOR_SUPERVISOR_MAX_BACKOFF_SECONDS);
            warn!(restart_count, backoff_seconds, "oracle simulator restart backoff");
            sleep(Duration::from_secs(backoff_seconds)).await;
        }
    });
}

fn build_cors_layer(config: &AppConfig) -> CorsLayer {
    let allowed_origins = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(false)
}
