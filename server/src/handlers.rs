//! API handlers for the FlightSurety server

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use flight_surety_ledger::{
    AccountId, EventRecord, Flight, FlightKey, FlightStatus, InsurancePolicy, Ledger, LedgerError,
    RegistrationOutcome, RequestKey, ResponseOutcome,
};
use validator::Validate;

use crate::app_state::AppState;
use crate::error::{ApiError, ApiResult};
use crate::models::{
    AirlineView, ApiResponse, BuyInsuranceRequest, EventsQuery, FetchFlightStatusRequest,
    FlightView, FundAirlineRequest, HealthStatus, OperationalStatus, OracleIndexes,
    OracleResponseRequest, PassengerBalance, RegisterAirlineRequest, RegisterFlightRequest,
    RegisterOracleRequest, SetOperationalRequest, Withdrawal, WithdrawRequest,
};
use crate::service::LedgerService;

const DEFAULT_EVENT_PAGE: usize = 100;
const MAX_EVENT_PAGE: usize = 1000;

pub async fn root() -> &'static str {
    "FlightSurety API Server"
}

pub async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<HealthStatus>> {
    let ledger = state.ledger.read(|ledger| ledger.summary()).await;
    let time = Utc::now();
    Json(ApiResponse::ok(HealthStatus {
        status: "OK",
        time,
        uptime_seconds: state.uptime_seconds(time),
        ledger,
    }))
}

// ===== Operational gate =====

pub async fn get_operational(
    State(service): State<Arc<LedgerService>>,
) -> ApiResult<OperationalStatus> {
    let operational = service.read(|ledger| ledger.is_operational()).await;
    Ok(Json(ApiResponse::ok(OperationalStatus { operational })))
}

/// Open or close the ledger (owner only)
pub async fn set_operational(
    State(service): State<Arc<LedgerService>>,
    Json(request): Json<SetOperationalRequest>,
) -> ApiResult<OperationalStatus> {
    request.validate()?;
    let caller = AccountId::new(request.from);

    let operational = service
        .transact(|ledger| {
            ledger.set_operating_status(&caller, request.operational)?;
            Ok(ledger.is_operational())
        })
        .await?;

    Ok(Json(ApiResponse::ok(OperationalStatus { operational })))
}

// ===== Airlines =====

/// Pay the airline registration fee
pub async fn fund_airline(
    State(service): State<Arc<LedgerService>>,
    Json(request): Json<FundAirlineRequest>,
) -> ApiResult<AirlineView> {
    request.validate()?;
    let airline = AccountId::new(request.from);

    let view = service
        .transact(|ledger| {
            ledger.fund(&airline, request.value)?;
            airline_view(ledger, &airline).ok_or(LedgerError::AirlineNotRegistered)
        })
        .await?;

    Ok(Json(ApiResponse::ok(view)))
}

/// Sponsor or vote for a candidate airline
pub async fn register_airline(
    State(service): State<Arc<LedgerService>>,
    Json(request): Json<RegisterAirlineRequest>,
) -> ApiResult<RegistrationOutcome> {
    request.validate()?;
    let sponsor = AccountId::new(request.from);
    let candidate = AccountId::new(request.airline);

    let outcome = service
        .transact(|ledger| ledger.register_airline(&sponsor, &candidate))
        .await?;

    Ok(Json(ApiResponse::ok(outcome)))
}

pub async fn get_airline(
    State(service): State<Arc<LedgerService>>,
    Path(id): Path<String>,
) -> ApiResult<AirlineView> {
    let airline = AccountId::new(id);
    service
        .read(|ledger| airline_view(ledger, &airline))
        .await
        .map(|view| Json(ApiResponse::ok(view)))
        .ok_or_else(|| ApiError::NotFound("Airline not found".to_string()))
}

fn airline_view(ledger: &Ledger, id: &AccountId) -> Option<AirlineView> {
    let airlines = ledger.airlines();
    airlines.get(id).map(|airline| AirlineView {
        airline: airline.clone(),
        votes_required: airlines.required_votes(),
    })
}

// ===== Flights =====

pub async fn register_flight(
    State(service): State<Arc<LedgerService>>,
    Json(request): Json<RegisterFlightRequest>,
) -> ApiResult<Flight> {
    request.validate()?;
    let airline = AccountId::new(request.from);

    let flight = service
        .transact(|ledger| {
            let key = ledger.register_flight(&airline, &request.flight)?;
            ledger
                .flight(&key)
                .cloned()
                .ok_or(LedgerError::FlightNotFound)
        })
        .await?;

    Ok(Json(ApiResponse::ok(flight)))
}

/// Flight codes in registration order
pub async fn list_flights(State(service): State<Arc<LedgerService>>) -> ApiResult<Vec<String>> {
    let flights = service.read(|ledger| ledger.flight_list()).await;
    Ok(Json(ApiResponse::ok(flights)))
}

pub async fn get_flight(
    State(service): State<Arc<LedgerService>>,
    Path((airline, flight)): Path<(String, String)>,
) -> ApiResult<FlightView> {
    let key = FlightKey::new(airline, flight);
    service
        .read(|ledger| {
            ledger.flight(&key).map(|flight| FlightView {
                flight: flight.clone(),
                requests: ledger
                    .oracles()
                    .requests_for(&key)
                    .into_iter()
                    .cloned()
                    .collect(),
            })
        })
        .await
        .map(|view| Json(ApiResponse::ok(view)))
        .ok_or_else(|| ApiError::NotFound("Flight not found".to_string()))
}

// ===== Oracles =====

/// Ask the oracles for a flight's status
pub async fn fetch_flight_status(
    State(service): State<Arc<LedgerService>>,
    Json(request): Json<FetchFlightStatusRequest>,
) -> ApiResult<RequestKey> {
    request.validate()?;
    let requester = AccountId::new(request.from);
    let airline = AccountId::new(request.airline);
    let timestamp = request
        .timestamp
        .unwrap_or_else(|| u64::try_from(Utc::now().timestamp()).unwrap_or(0));

    let key = service
        .transact(|ledger| {
            ledger.fetch_flight_status(&requester, &airline, &request.flight, timestamp)
        })
        .await?;

    Ok(Json(ApiResponse::ok(key)))
}

pub async fn register_oracle(
    State(service): State<Arc<LedgerService>>,
    Json(request): Json<RegisterOracleRequest>,
) -> ApiResult<OracleIndexes> {
    request.validate()?;
    let oracle = AccountId::new(request.from);

    let indexes = service
        .transact(|ledger| ledger.register_oracle(&oracle, request.value))
        .await?;

    Ok(Json(ApiResponse::ok(OracleIndexes {
        oracle: oracle.to_string(),
        indexes,
    })))
}

pub async fn get_oracle_indexes(
    State(service): State<Arc<LedgerService>>,
    Path(id): Path<String>,
) -> ApiResult<OracleIndexes> {
    let oracle = AccountId::new(id);
    let indexes = service.read(|ledger| ledger.my_indexes(&oracle)).await?;

    Ok(Json(ApiResponse::ok(OracleIndexes {
        oracle: oracle.to_string(),
        indexes,
    })))
}

/// Submit an oracle's status report. Mismatched reports come back as
/// `ignored` with a reason rather than as errors.
pub async fn submit_oracle_response(
    State(service): State<Arc<LedgerService>>,
    Json(request): Json<OracleResponseRequest>,
) -> ApiResult<ResponseOutcome> {
    request.validate()?;
    let status = FlightStatus::try_from(request.status)?;
    let oracle = AccountId::new(request.from);
    let airline = AccountId::new(request.airline);

    let outcome = service
        .transact(|ledger| {
            ledger.submit_oracle_response(
                &oracle,
                request.index,
                &airline,
                &request.flight,
                request.timestamp,
                status,
            )
        })
        .await?;

    Ok(Json(ApiResponse::ok(outcome)))
}

// ===== Insurance =====

pub async fn buy_insurance(
    State(service): State<Arc<LedgerService>>,
    Json(request): Json<BuyInsuranceRequest>,
) -> ApiResult<InsurancePolicy> {
    request.validate()?;
    let passenger = AccountId::new(request.from);
    let flight = FlightKey::new(request.airline, request.flight.trim());

    let policy = service
        .transact(|ledger| {
            ledger.buy(&passenger, &flight, request.value)?;
            ledger
                .escrow()
                .policy(&passenger, &flight)
                .cloned()
                .ok_or(LedgerError::FlightNotFound)
        })
        .await?;

    Ok(Json(ApiResponse::ok(policy)))
}

/// Withdraw a credited payout
pub async fn withdraw(
    State(service): State<Arc<LedgerService>>,
    Json(request): Json<WithdrawRequest>,
) -> ApiResult<Withdrawal> {
    request.validate()?;
    let passenger = AccountId::new(request.from);
    let flight = FlightKey::new(request.airline, request.flight.trim());

    let amount = service
        .transact(|ledger| ledger.pay(&passenger, &flight))
        .await?;

    Ok(Json(ApiResponse::ok(Withdrawal {
        passenger: passenger.to_string(),
        amount,
    })))
}

pub async fn get_balance(
    State(service): State<Arc<LedgerService>>,
    Path((passenger, airline, flight)): Path<(String, String, String)>,
) -> ApiResult<PassengerBalance> {
    let passenger = AccountId::new(passenger);
    let key = FlightKey::new(airline, flight);

    let (balance, policy) = service
        .read(|ledger| {
            (
                ledger.account_balance(&passenger, &key),
                ledger.escrow().policy(&passenger, &key).cloned(),
            )
        })
        .await;

    Ok(Json(ApiResponse::ok(PassengerBalance {
        passenger: passenger.to_string(),
        airline: key.airline.to_string(),
        flight: key.flight,
        balance,
        policy,
    })))
}

// ===== Events =====

/// Committed events after `after`, oldest first
pub async fn list_events(
    State(service): State<Arc<LedgerService>>,
    Query(query): Query<EventsQuery>,
) -> ApiResult<Vec<EventRecord>> {
    let limit = query.limit.unwrap_or(DEFAULT_EVENT_PAGE).min(MAX_EVENT_PAGE);
    let events = service.events_since(query.after.unwrap_or(0), limit).await;
    Ok(Json(ApiResponse::ok(events)))
}
