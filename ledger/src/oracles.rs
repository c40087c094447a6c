//! Oracle consensus: registration, status requests and quorum resolution.
//!
//! Each oracle holds three indexes. A status request carries one index and
//! only oracles holding it may answer. Responses that do not fit any open
//! request are ignored rather than rejected, since agents answer every
//! request they observe. The first status to collect [`MIN_RESPONSES`]
//! distinct oracles resolves the request; later responses are kept for the
//! record and change nothing else.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::events::LedgerEvent;
use crate::ledger::Ledger;
use crate::types::{AccountId, Amount, FlightKey, FlightStatus, RequestKey, ONE_ETHER};

/// Exact payment required to register an oracle.
pub const ORACLE_REGISTRATION_FEE: Amount = ONE_ETHER;

/// Matching responses needed to resolve a request.
pub const MIN_RESPONSES: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Oracle {
    pub id: AccountId,
    pub indexes: [u8; 3],
}

impl Oracle {
    pub fn holds(&self, index: u8) -> bool {
        self.indexes.contains(&index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleRequest {
    pub key: RequestKey,
    pub requester: AccountId,
    pub resolved: bool,
    pub resolved_status: Option<FlightStatus>,
    pub responses: BTreeMap<FlightStatus, BTreeSet<AccountId>>,
    pub responders: BTreeSet<AccountId>,
}

impl OracleRequest {
    fn open(key: RequestKey, requester: AccountId) -> Self {
        Self {
            key,
            requester,
            resolved: false,
            resolved_status: None,
            responses: BTreeMap::new(),
            responders: BTreeSet::new(),
        }
    }

    pub fn count_for(&self, status: FlightStatus) -> usize {
        self.responses.get(&status).map_or(0, BTreeSet::len)
    }

    fn record(&mut self, oracle: &AccountId, status: FlightStatus) -> usize {
        self.responders.insert(oracle.clone());
        let bucket = self.responses.entry(status).or_default();
        bucket.insert(oracle.clone());
        bucket.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    NotRegistered,
    IndexMismatch,
    NoSuchRequest,
    AlreadyResponded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ResponseOutcome {
    Ignored { reason: IgnoreReason },
    Recorded { status: FlightStatus, count: u32 },
    Resolved { status: FlightStatus },
    RecordedAfterResolution { status: FlightStatus },
}

#[derive(Debug, Default)]
pub struct OracleConsensus {
    oracles: HashMap<AccountId, Oracle>,
    requests: HashMap<RequestKey, OracleRequest>,
    registrations: u64,
    fetches: u64,
}

impl OracleConsensus {
    pub fn oracle(&self, id: &AccountId) -> Option<&Oracle> {
        self.oracles.get(id)
    }

    pub fn is_oracle_registered(&self, id: &AccountId) -> bool {
        self.oracles.contains_key(id)
    }

    pub fn oracle_count(&self) -> usize {
        self.oracles.len()
    }

    pub fn request(&self, key: &RequestKey) -> Option<&OracleRequest> {
        self.requests.get(key)
    }

    pub fn open_request_count(&self) -> usize {
        self.requests.values().filter(|r| !r.resolved).count()
    }

    /// Requests for one flight, open ones first.
    pub fn requests_for(&self, flight: &FlightKey) -> Vec<&OracleRequest> {
        let mut requests: Vec<_> = self
            .requests
            .values()
            .filter(|r| r.key.airline == flight.airline && r.key.flight == flight.flight)
            .collect();
        requests.sort_by(|a, b| a.resolved.cmp(&b.resolved).then_with(|| a.key.cmp(&b.key)));
        requests
    }

    /// Decide what a response would do, without touching state.
    fn classify(
        &self,
        oracle: &AccountId,
        key: &RequestKey,
        status: FlightStatus,
    ) -> Result<(bool, usize), IgnoreReason> {
        let registered = self.oracles.get(oracle).ok_or(IgnoreReason::NotRegistered)?;
        if !registered.holds(key.index) {
            return Err(IgnoreReason::IndexMismatch);
        }
        let request = self.requests.get(key).ok_or(IgnoreReason::NoSuchRequest)?;
        if request.responders.contains(oracle) {
            return Err(IgnoreReason::AlreadyResponded);
        }
        Ok((request.resolved, request.count_for(status) + 1))
    }
}

impl Ledger {
    /// Register the caller as an oracle. Returns its assigned indexes.
    pub fn register_oracle(
        &mut self,
        oracle: &AccountId,
        value: Amount,
    ) -> Result<[u8; 3], LedgerError> {
        self.gate.require_operational()?;
        if oracle.is_empty() {
            return Err(LedgerError::InvalidAccount);
        }
        if value != ORACLE_REGISTRATION_FEE {
            tracing::warn!(%oracle, value, "oracle registration with wrong fee");
            return Err(LedgerError::WrongOracleFee);
        }
        if self.oracles.is_oracle_registered(oracle) {
            return Err(LedgerError::OracleAlreadyRegistered);
        }

        let indexes = self
            .indexes
            .oracle_indexes(oracle, self.oracles.registrations);
        self.oracles.registrations += 1;
        self.treasury.deposit(oracle, value);
        self.oracles.oracles.insert(
            oracle.clone(),
            Oracle {
                id: oracle.clone(),
                indexes,
            },
        );

        tracing::info!(%oracle, ?indexes, "oracle registered");
        self.publish(LedgerEvent::OracleRegistered {
            oracle: oracle.clone(),
            indexes,
        });
        Ok(indexes)
    }

    pub fn my_indexes(&self, oracle: &AccountId) -> Result<[u8; 3], LedgerError> {
        self.oracles
            .oracle(oracle)
            .map(|o| o.indexes)
            .ok_or(LedgerError::OracleNotRegistered)
    }

    /// Open a status request for a registered flight. The returned key names
    /// the index oracles must hold to answer.
    pub fn fetch_flight_status(
        &mut self,
        requester: &AccountId,
        airline: &AccountId,
        flight: &str,
        timestamp: u64,
    ) -> Result<RequestKey, LedgerError> {
        self.gate.require_operational()?;

        let flight_key = FlightKey::new(airline.clone(), flight.trim());
        if !self.flights.contains(&flight_key) {
            return Err(LedgerError::FlightNotFound);
        }

        let index = self
            .indexes
            .request_index(requester, self.oracles.fetches);
        let key = RequestKey::new(index, &flight_key, timestamp);
        if self.oracles.requests.contains_key(&key) {
            tracing::warn!(request = %key, "duplicate status request");
            return Err(LedgerError::DuplicateRequest);
        }

        self.oracles.fetches += 1;
        self.oracles
            .requests
            .insert(key.clone(), OracleRequest::open(key.clone(), requester.clone()));

        tracing::info!(%requester, request = %key, "flight status requested");
        self.publish(LedgerEvent::StatusRequested {
            index,
            airline: key.airline.clone(),
            flight: key.flight.clone(),
            timestamp,
        });
        Ok(key)
    }

    /// Record an oracle's answer to a status request.
    ///
    /// Responses that match no open slot come back as
    /// [`ResponseOutcome::Ignored`]. The response that brings a status to
    /// [`MIN_RESPONSES`] resolves the request. If it is the first resolution
    /// for the flight it also writes the flight status and, for `LateAirline`,
    /// credits every insured passenger.
    pub fn submit_oracle_response(
        &mut self,
        oracle: &AccountId,
        index: u8,
        airline: &AccountId,
        flight: &str,
        timestamp: u64,
        status: FlightStatus,
    ) -> Result<ResponseOutcome, LedgerError> {
        self.gate.require_operational()?;

        let flight_key = FlightKey::new(airline.clone(), flight.trim());
        let key = RequestKey::new(index, &flight_key, timestamp);
        let (resolved, count) = match self.oracles.classify(oracle, &key, status) {
            Ok(state) => state,
            Err(reason) => {
                tracing::debug!(%oracle, request = %key, ?reason, "oracle response ignored");
                return Ok(ResponseOutcome::Ignored { reason });
            }
        };

        let resolves = !resolved && count >= MIN_RESPONSES;
        // Only the first resolution for a flight sets its status.
        let settles = resolves
            && self
                .flights
                .get(&flight_key)
                .is_some_and(|f| !f.is_settled());
        let pays_out = settles && status.pays_out();
        if pays_out {
            // Overflow surfaces here, before the request is touched.
            self.escrow.plan_credits(&flight_key)?;
        }

        let Some(request) = self.oracles.requests.get_mut(&key) else {
            return Ok(ResponseOutcome::Ignored {
                reason: IgnoreReason::NoSuchRequest,
            });
        };
        request.record(oracle, status);
        if resolves {
            request.resolved = true;
            request.resolved_status = Some(status);
        }

        self.publish(LedgerEvent::OracleReport {
            oracle: oracle.clone(),
            index,
            airline: key.airline.clone(),
            flight: key.flight.clone(),
            timestamp,
            status,
        });

        if resolved {
            tracing::debug!(%oracle, request = %key, %status, "late oracle response recorded");
            return Ok(ResponseOutcome::RecordedAfterResolution { status });
        }
        if !resolves {
            tracing::debug!(%oracle, request = %key, %status, count, "oracle response recorded");
            return Ok(ResponseOutcome::Recorded {
                status,
                count: count as u32,
            });
        }

        if !settles {
            tracing::info!(request = %key, %status, "request resolved; flight status already settled");
            return Ok(ResponseOutcome::Resolved { status });
        }

        self.flights.record_status(&flight_key, status, timestamp);
        tracing::info!(request = %key, %status, "flight status resolved");
        self.publish(LedgerEvent::FlightStatusResolved {
            index,
            airline: key.airline.clone(),
            flight: key.flight.clone(),
            timestamp,
            status,
        });
        if pays_out {
            self.credit_insurees(&flight_key)?;
        }

        Ok(ResponseOutcome::Resolved { status })
    }

    pub fn oracle_request(&self, key: &RequestKey) -> Option<&OracleRequest> {
        self.oracles.request(key)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testutils::{acct, ether, setup_with_flight};
    use proptest::prelude::*;

    const TIMESTAMP: u64 = 1_700_000_000;

    fn oracle(n: usize) -> AccountId {
        AccountId::new(format!("0xoracle{n}"))
    }

    fn register_oracles(ledger: &mut Ledger, count: usize) {
        for n in 0..count {
            ledger.register_oracle(&oracle(n), ORACLE_REGISTRATION_FEE).unwrap();
        }
    }

    /// Oracles holding the request's index, in registration order.
    fn matching(ledger: &Ledger, count: usize, key: &RequestKey) -> Vec<AccountId> {
        (0..count)
            .map(oracle)
            .filter(|o| ledger.my_indexes(o).unwrap().contains(&key.index))
            .collect()
    }

    fn respond(
        ledger: &mut Ledger,
        responder: &AccountId,
        key: &RequestKey,
        status: FlightStatus,
    ) -> ResponseOutcome {
        ledger
            .submit_oracle_response(
                responder,
                key.index,
                &key.airline,
                &key.flight,
                key.timestamp,
                status,
            )
            .unwrap()
    }

    #[test]
    fn test_register_oracle_requires_exact_fee() {
        let (mut ledger, _) = setup_with_flight();
        assert_eq!(
            ledger.register_oracle(&oracle(0), ether(2)),
            Err(LedgerError::WrongOracleFee)
        );
        assert_eq!(
            ledger.register_oracle(&oracle(0), ether(1) - 1),
            Err(LedgerError::WrongOracleFee)
        );
        assert!(!ledger.oracles().is_oracle_registered(&oracle(0)));

        let indexes = ledger.register_oracle(&oracle(0), ether(1)).unwrap();
        assert!(indexes.iter().all(|i| *i < crate::rng::ORACLE_INDEX_RANGE));
        assert_eq!(ledger.my_indexes(&oracle(0)), Ok(indexes));
        assert_eq!(
            ledger.register_oracle(&oracle(0), ether(1)),
            Err(LedgerError::OracleAlreadyRegistered)
        );
    }

    #[test]
    fn test_unregistered_oracle_has_no_indexes() {
        let (ledger, _) = setup_with_flight();
        assert_eq!(
            ledger.my_indexes(&oracle(3)),
            Err(LedgerError::OracleNotRegistered)
        );
    }

    #[test]
    fn test_fetch_requires_registered_flight() {
        let (mut ledger, key) = setup_with_flight();
        assert_eq!(
            ledger.fetch_flight_status(&acct("0xp"), &key.airline, "XX0000", TIMESTAMP),
            Err(LedgerError::FlightNotFound)
        );

        let request = ledger
            .fetch_flight_status(&acct("0xp"), &key.airline, &key.flight, TIMESTAMP)
            .unwrap();
        assert_eq!(request.flight_key(), key);
        assert_eq!(ledger.oracles().open_request_count(), 1);
        assert_eq!(
            ledger.events().iter().last().unwrap().event,
            LedgerEvent::StatusRequested {
                index: request.index,
                airline: key.airline.clone(),
                flight: key.flight.clone(),
                timestamp: TIMESTAMP,
            }
        );
    }

    #[test]
    fn test_requests_for_different_timestamps_coexist() {
        let (mut ledger, key) = setup_with_flight();
        for ts in 0..5 {
            ledger
                .fetch_flight_status(&acct("0xp"), &key.airline, &key.flight, TIMESTAMP + ts)
                .unwrap();
        }
        assert_eq!(ledger.oracles().open_request_count(), 5);
        assert_eq!(ledger.oracles().requests_for(&key).len(), 5);
    }

    #[test]
    fn test_unmatched_index_is_ignored() {
        let (mut ledger, key) = setup_with_flight();
        register_oracles(&mut ledger, 1);
        let held = ledger.my_indexes(&oracle(0)).unwrap();
        let request = ledger
            .fetch_flight_status(&acct("0xp"), &key.airline, &key.flight, TIMESTAMP)
            .unwrap();
        let before = ledger.summary();

        let foreign = (0..crate::rng::ORACLE_INDEX_RANGE)
            .find(|i| !held.contains(i))
            .unwrap();
        let outcome = ledger
            .submit_oracle_response(
                &oracle(0),
                foreign,
                &key.airline,
                &key.flight,
                TIMESTAMP,
                FlightStatus::LateAirline,
            )
            .unwrap();

        assert_eq!(
            outcome,
            ResponseOutcome::Ignored {
                reason: IgnoreReason::IndexMismatch
            }
        );
        assert_eq!(ledger.summary(), before);
        assert_eq!(ledger.flight(&key).unwrap().status, FlightStatus::Unknown);
        assert_eq!(ledger.oracle_request(&request).unwrap().responders.len(), 0);
    }

    #[test]
    fn test_unknown_oracle_and_missing_request_are_ignored() {
        let (mut ledger, key) = setup_with_flight();
        register_oracles(&mut ledger, 1);
        let held = ledger.my_indexes(&oracle(0)).unwrap();

        let outcome = ledger
            .submit_oracle_response(
                &oracle(99),
                held[0],
                &key.airline,
                &key.flight,
                TIMESTAMP,
                FlightStatus::OnTime,
            )
            .unwrap();
        assert_eq!(
            outcome,
            ResponseOutcome::Ignored {
                reason: IgnoreReason::NotRegistered
            }
        );

        let outcome = ledger
            .submit_oracle_response(
                &oracle(0),
                held[0],
                &key.airline,
                &key.flight,
                TIMESTAMP,
                FlightStatus::OnTime,
            )
            .unwrap();
        assert_eq!(
            outcome,
            ResponseOutcome::Ignored {
                reason: IgnoreReason::NoSuchRequest
            }
        );
    }

    #[test]
    fn test_quorum_resolves_once_and_credits_passengers() {
        let (mut ledger, key) = setup_with_flight();
        let passenger = acct("0xpassenger");
        ledger.buy(&passenger, &key, ether(1)).unwrap();
        register_oracles(&mut ledger, 80);

        let request = ledger
            .fetch_flight_status(&passenger, &key.airline, &key.flight, TIMESTAMP)
            .unwrap();
        let matching = matching(&ledger, 80, &request);
        assert!(matching.len() >= 7);

        assert_eq!(
            respond(&mut ledger, &matching[0], &request, FlightStatus::LateAirline),
            ResponseOutcome::Recorded {
                status: FlightStatus::LateAirline,
                count: 1
            }
        );
        assert_eq!(
            respond(&mut ledger, &matching[1], &request, FlightStatus::OnTime),
            ResponseOutcome::Recorded {
                status: FlightStatus::OnTime,
                count: 1
            }
        );
        respond(&mut ledger, &matching[2], &request, FlightStatus::LateAirline);
        assert_eq!(ledger.account_balance(&passenger, &key), 0);

        let before = ledger.events().last_sequence();
        assert_eq!(
            respond(&mut ledger, &matching[3], &request, FlightStatus::LateAirline),
            ResponseOutcome::Resolved {
                status: FlightStatus::LateAirline
            }
        );
        let names: Vec<_> = ledger
            .events()
            .since(before)
            .iter()
            .map(|r| r.event.name())
            .collect();
        assert_eq!(
            names,
            vec!["OracleReport", "FlightStatusResolved", "PassengerCredited"]
        );
        assert_eq!(ledger.account_balance(&passenger, &key), ether(3) / 2);
        assert_eq!(
            ledger.flight(&key).unwrap().status,
            FlightStatus::LateAirline
        );
        assert_eq!(ledger.oracles().open_request_count(), 0);

        // Late answers, even a competing quorum, change nothing.
        for late in &matching[4..7] {
            assert_eq!(
                respond(&mut ledger, late, &request, FlightStatus::OnTime),
                ResponseOutcome::RecordedAfterResolution {
                    status: FlightStatus::OnTime
                }
            );
        }
        assert_eq!(
            ledger.flight(&key).unwrap().status,
            FlightStatus::LateAirline
        );
        assert_eq!(ledger.account_balance(&passenger, &key), ether(3) / 2);
        let stored = ledger.oracle_request(&request).unwrap();
        assert_eq!(stored.resolved_status, Some(FlightStatus::LateAirline));
        assert_eq!(stored.count_for(FlightStatus::OnTime), 4);
    }

    #[test]
    fn test_oracle_answers_once_per_request() {
        let (mut ledger, key) = setup_with_flight();
        register_oracles(&mut ledger, 40);
        let request = ledger
            .fetch_flight_status(&acct("0xp"), &key.airline, &key.flight, TIMESTAMP)
            .unwrap();
        let first = matching(&ledger, 40, &request)[0].clone();

        respond(&mut ledger, &first, &request, FlightStatus::OnTime);
        assert_eq!(
            respond(&mut ledger, &first, &request, FlightStatus::LateAirline),
            ResponseOutcome::Ignored {
                reason: IgnoreReason::AlreadyResponded
            }
        );
        let stored = ledger.oracle_request(&request).unwrap();
        assert_eq!(stored.count_for(FlightStatus::LateAirline), 0);
    }

    #[test]
    fn test_non_paying_status_credits_nobody() {
        let (mut ledger, key) = setup_with_flight();
        let passenger = acct("0xpassenger");
        ledger.buy(&passenger, &key, ether(1)).unwrap();
        register_oracles(&mut ledger, 40);
        let request = ledger
            .fetch_flight_status(&passenger, &key.airline, &key.flight, TIMESTAMP)
            .unwrap();

        for responder in matching(&ledger, 40, &request).iter().take(3) {
            respond(&mut ledger, responder, &request, FlightStatus::LateWeather);
        }

        assert_eq!(
            ledger.flight(&key).unwrap().status,
            FlightStatus::LateWeather
        );
        assert_eq!(ledger.account_balance(&passenger, &key), 0);
        assert_eq!(
            ledger.buy(&passenger, &key, ether(1)),
            Err(LedgerError::FlightAlreadySettled)
        );
    }

    #[test]
    fn test_first_resolution_fixes_flight_status() {
        let (mut ledger, key) = setup_with_flight();
        let passenger = acct("0xpassenger");
        ledger.buy(&passenger, &key, ether(1)).unwrap();
        register_oracles(&mut ledger, 60);

        let resolve = |ledger: &mut Ledger, timestamp: u64, status: FlightStatus| {
            let request = ledger
                .fetch_flight_status(&passenger, &key.airline, &key.flight, timestamp)
                .unwrap();
            let responders = matching(ledger, 60, &request);
            let outcomes: Vec<_> = responders
                .iter()
                .take(3)
                .map(|responder| respond(ledger, responder, &request, status))
                .collect();
            assert_eq!(outcomes.last(), Some(&ResponseOutcome::Resolved { status }));
            request
        };

        resolve(&mut ledger, 1, FlightStatus::OnTime);
        let settled = ledger.events().last_sequence();

        let second = resolve(&mut ledger, 2, FlightStatus::LateAirline);
        assert_eq!(ledger.flight(&key).unwrap().status, FlightStatus::OnTime);
        assert_eq!(ledger.account_balance(&passenger, &key), 0);
        assert_eq!(
            ledger.oracle_request(&second).unwrap().resolved_status,
            Some(FlightStatus::LateAirline)
        );

        resolve(&mut ledger, 3, FlightStatus::OnTime);
        let flight = ledger.flight(&key).unwrap();
        assert_eq!(flight.status, FlightStatus::OnTime);
        assert_eq!(flight.status_timestamp, Some(1));
        assert_eq!(ledger.account_balance(&passenger, &key), 0);
        assert!(!ledger.escrow().policy(&passenger, &key).unwrap().credited);
        assert!(ledger
            .events()
            .since(settled)
            .iter()
            .all(|r| !matches!(
                r.event,
                LedgerEvent::FlightStatusResolved { .. } | LedgerEvent::PassengerCredited { .. }
            )));
    }

    fn arb_status() -> impl Strategy<Value = FlightStatus> {
        proptest::sample::select(FlightStatus::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn test_request_resolves_at_most_once(
            responses in proptest::collection::vec((0usize..30, arb_status()), 1..120),
        ) {
            let (mut ledger, key) = setup_with_flight();
            register_oracles(&mut ledger, 30);
            let request = ledger
                .fetch_flight_status(&acct("0xp"), &key.airline, &key.flight, TIMESTAMP)
                .unwrap();

            let mut resolutions = Vec::new();
            for (n, status) in responses {
                if let ResponseOutcome::Resolved { status } =
                    respond(&mut ledger, &oracle(n), &request, status)
                {
                    resolutions.push(status);
                }
            }

            prop_assert!(resolutions.len() <= 1);
            let stored = ledger.oracle_request(&request).unwrap();
            prop_assert_eq!(stored.resolved, resolutions.len() == 1);
            if let Some(status) = resolutions.first() {
                prop_assert_eq!(stored.resolved_status, Some(*status));
                prop_assert!(stored.count_for(*status) >= MIN_RESPONSES);
                prop_assert_eq!(ledger.flight(&key).unwrap().status, *status);
            }
            for oracle_id in &stored.responders {
                prop_assert!(ledger.my_indexes(oracle_id).unwrap().contains(&request.index));
            }
        }
    }
}
