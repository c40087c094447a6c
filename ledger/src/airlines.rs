//! Airline registry: admission by sponsorship or majority vote, and funding.
//!
//! While fewer than [`MULTIPARTY_THRESHOLD`] airlines are registered, any
//! funded airline admits a candidate on its own. From then on each funded
//! airline casts one vote per candidate and the candidate is admitted once it
//! holds votes from at least half of the registered airlines (rounded up).

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::events::LedgerEvent;
use crate::ledger::Ledger;
use crate::types::{AccountId, Amount, ONE_ETHER};

/// Fee an airline pays before it may sponsor, vote or register flights.
pub const AIRLINE_REGISTRATION_FEE: Amount = 10 * ONE_ETHER;

/// Registered airline count at which admission switches to voting.
pub const MULTIPARTY_THRESHOLD: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Airline {
    pub id: AccountId,
    pub registered: bool,
    pub funded: bool,
    /// Funded airlines that voted to admit this one.
    pub votes: BTreeSet<AccountId>,
    /// Registration fee retained by the ledger.
    pub funds: Amount,
}

impl Airline {
    fn candidate(id: AccountId) -> Self {
        Self {
            id,
            registered: false,
            funded: false,
            votes: BTreeSet::new(),
            funds: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RegistrationOutcome {
    /// Admitted on the sponsor's word during bootstrap.
    Admitted,
    /// The sponsor's vote completed the majority.
    Elected { votes: u32, required: u32 },
    /// Vote counted; the candidate is still waiting.
    VoteRecorded { votes: u32, required: u32 },
}

#[derive(Debug, Default)]
pub struct AirlineRegistry {
    airlines: HashMap<AccountId, Airline>,
    registered: usize,
}

impl AirlineRegistry {
    pub(crate) fn with_genesis(genesis: AccountId) -> Self {
        let mut registry = Self::default();
        registry.mark_registered(&genesis);
        registry
    }

    pub fn get(&self, id: &AccountId) -> Option<&Airline> {
        self.airlines.get(id)
    }

    pub fn is_registered(&self, id: &AccountId) -> bool {
        self.airlines.get(id).is_some_and(|a| a.registered)
    }

    pub fn is_funded(&self, id: &AccountId) -> bool {
        self.airlines.get(id).is_some_and(|a| a.funded)
    }

    pub fn registered_count(&self) -> usize {
        self.registered
    }

    pub fn funded_count(&self) -> usize {
        self.airlines.values().filter(|a| a.funded).count()
    }

    pub fn votes_for(&self, candidate: &AccountId) -> usize {
        self.airlines.get(candidate).map_or(0, |a| a.votes.len())
    }

    /// Votes needed to admit a candidate at the current membership size.
    pub fn required_votes(&self) -> usize {
        (self.registered + 1) / 2
    }

    /// Registered airlines in identity order.
    pub fn registered(&self) -> Vec<&Airline> {
        let mut airlines: Vec<&Airline> =
            self.airlines.values().filter(|a| a.registered).collect();
        airlines.sort_by(|a, b| a.id.cmp(&b.id));
        airlines
    }

    fn mark_registered(&mut self, id: &AccountId) {
        let airline = self
            .airlines
            .entry(id.clone())
            .or_insert_with(|| Airline::candidate(id.clone()));
        if !airline.registered {
            airline.registered = true;
            self.registered += 1;
        }
    }

    fn admit(
        &mut self,
        sponsor: &AccountId,
        candidate: &AccountId,
    ) -> Result<RegistrationOutcome, LedgerError> {
        if !self.is_funded(sponsor) {
            return Err(LedgerError::NotFunded);
        }
        if candidate.is_empty() {
            return Err(LedgerError::InvalidAccount);
        }
        if self.is_registered(candidate) {
            return Err(LedgerError::AirlineAlreadyRegistered);
        }

        if self.registered < MULTIPARTY_THRESHOLD {
            self.mark_registered(candidate);
            return Ok(RegistrationOutcome::Admitted);
        }

        if self
            .airlines
            .get(candidate)
            .is_some_and(|a| a.votes.contains(sponsor))
        {
            return Err(LedgerError::DuplicateVote);
        }

        let required = self.required_votes();
        let record = self
            .airlines
            .entry(candidate.clone())
            .or_insert_with(|| Airline::candidate(candidate.clone()));
        record.votes.insert(sponsor.clone());
        let votes = record.votes.len() as u32;
        let required = required as u32;

        if votes >= required {
            self.mark_registered(candidate);
            return Ok(RegistrationOutcome::Elected { votes, required });
        }

        Ok(RegistrationOutcome::VoteRecorded { votes, required })
    }

    fn check_fundable(&self, airline: &AccountId) -> Result<(), LedgerError> {
        match self.airlines.get(airline) {
            Some(a) if a.funded => Err(LedgerError::AlreadyFunded),
            Some(a) if a.registered => Ok(()),
            _ => Err(LedgerError::AirlineNotRegistered),
        }
    }
}

impl Ledger {
    /// Admit `candidate` on behalf of `sponsor`, or record the sponsor's vote.
    pub fn register_airline(
        &mut self,
        sponsor: &AccountId,
        candidate: &AccountId,
    ) -> Result<RegistrationOutcome, LedgerError> {
        self.gate.require_operational()?;

        let outcome = match self.airlines.admit(sponsor, candidate) {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!(%sponsor, %candidate, error = %err, "airline registration rejected");
                return Err(err);
            }
        };

        match outcome {
            RegistrationOutcome::VoteRecorded { votes, required } => {
                tracing::info!(%sponsor, %candidate, votes, required, "vote placed for airline");
                self.publish(LedgerEvent::VotePlacedFor {
                    candidate: candidate.clone(),
                    voter: sponsor.clone(),
                    votes,
                    required,
                });
            }
            RegistrationOutcome::Admitted | RegistrationOutcome::Elected { .. } => {
                if let RegistrationOutcome::Elected { votes, required } = outcome {
                    self.publish(LedgerEvent::VotePlacedFor {
                        candidate: candidate.clone(),
                        voter: sponsor.clone(),
                        votes,
                        required,
                    });
                }
                tracing::info!(
                    %sponsor,
                    %candidate,
                    registered = self.airlines.registered_count(),
                    "airline admitted"
                );
                self.publish(LedgerEvent::AirlineAdded {
                    candidate: candidate.clone(),
                    sponsor: sponsor.clone(),
                });
            }
        }

        Ok(outcome)
    }

    /// Pay the registration fee. Only [`AIRLINE_REGISTRATION_FEE`] is taken into
    /// custody; any excess attached to the call is returned to the caller.
    pub fn fund(&mut self, airline: &AccountId, value: Amount) -> Result<(), LedgerError> {
        self.gate.require_operational()?;
        self.airlines.check_fundable(airline)?;
        if value < AIRLINE_REGISTRATION_FEE {
            tracing::warn!(%airline, value, "registration fee underpaid");
            return Err(LedgerError::InsufficientFunding);
        }

        let refunded = value - AIRLINE_REGISTRATION_FEE;
        self.treasury.deposit(airline, AIRLINE_REGISTRATION_FEE);
        if let Some(record) = self.airlines.airlines.get_mut(airline) {
            record.funded = true;
            record.funds = AIRLINE_REGISTRATION_FEE;
        }

        tracing::info!(%airline, refunded, "airline funded");
        self.publish(LedgerEvent::AirlineFunded {
            airline: airline.clone(),
            amount: AIRLINE_REGISTRATION_FEE,
            refunded,
        });
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testutils::{
        acct, airline, ether, setup, setup_four_airlines, setup_funded, GENESIS,
    };
    use proptest::prelude::*;

    fn event_names(ledger: &Ledger, after: u64) -> Vec<&'static str> {
        ledger
            .events()
            .since(after)
            .iter()
            .map(|r| r.event.name())
            .collect()
    }

    #[test]
    fn test_unfunded_airline_cannot_register_another() {
        let mut ledger = setup();
        let err = ledger
            .register_airline(&acct(GENESIS), &airline(5))
            .unwrap_err();

        assert_eq!(err.to_string(), "You must pay registration fee to do that");
        assert!(!ledger.airlines().is_registered(&airline(5)));
    }

    #[test]
    fn test_funded_airline_admits_during_bootstrap() {
        let mut ledger = setup_funded();
        let before = ledger.events().last_sequence();

        let outcome = ledger
            .register_airline(&acct(GENESIS), &airline(1))
            .unwrap();

        assert_eq!(outcome, RegistrationOutcome::Admitted);
        assert!(ledger.airlines().is_registered(&airline(1)));
        assert_eq!(event_names(&ledger, before), vec!["AirlineAdded"]);
    }

    #[test]
    fn test_fifth_airline_needs_two_votes() {
        let mut ledger = setup_four_airlines();
        assert_eq!(ledger.airlines().registered_count(), 4);

        let before = ledger.events().last_sequence();
        let outcome = ledger
            .register_airline(&acct(GENESIS), &airline(4))
            .unwrap();
        assert_eq!(
            outcome,
            RegistrationOutcome::VoteRecorded {
                votes: 1,
                required: 2
            }
        );
        assert!(!ledger.airlines().is_registered(&airline(4)));
        assert_eq!(event_names(&ledger, before), vec!["VotePlacedFor"]);

        ledger.fund(&airline(1), ether(10)).unwrap();
        let before = ledger.events().last_sequence();
        let outcome = ledger.register_airline(&airline(1), &airline(4)).unwrap();

        assert_eq!(
            outcome,
            RegistrationOutcome::Elected {
                votes: 2,
                required: 2
            }
        );
        assert!(ledger.airlines().is_registered(&airline(4)));
        assert_eq!(ledger.airlines().registered_count(), 5);
        assert_eq!(
            event_names(&ledger, before),
            vec!["VotePlacedFor", "AirlineAdded"]
        );
    }

    #[test]
    fn test_repeat_vote_is_rejected_and_not_counted() {
        let mut ledger = setup_four_airlines();
        ledger
            .register_airline(&acct(GENESIS), &airline(4))
            .unwrap();

        assert_eq!(
            ledger.register_airline(&acct(GENESIS), &airline(4)),
            Err(LedgerError::DuplicateVote)
        );
        assert_eq!(ledger.airlines().votes_for(&airline(4)), 1);
        assert!(!ledger.airlines().is_registered(&airline(4)));
    }

    #[test]
    fn test_unfunded_registered_airline_cannot_vote() {
        let mut ledger = setup_four_airlines();
        assert_eq!(
            ledger.register_airline(&airline(2), &airline(4)),
            Err(LedgerError::NotFunded)
        );
        assert_eq!(ledger.airlines().votes_for(&airline(4)), 0);
    }

    #[test]
    fn test_registered_airline_cannot_be_admitted_twice() {
        let mut ledger = setup_funded();
        ledger
            .register_airline(&acct(GENESIS), &airline(1))
            .unwrap();
        assert_eq!(
            ledger.register_airline(&acct(GENESIS), &airline(1)),
            Err(LedgerError::AirlineAlreadyRegistered)
        );
        assert_eq!(ledger.airlines().registered_count(), 2);
    }

    #[test]
    fn test_fund_requires_registration() {
        let mut ledger = setup();
        assert_eq!(
            ledger.fund(&airline(9), ether(10)),
            Err(LedgerError::AirlineNotRegistered)
        );
    }

    #[test]
    fn test_fund_rejects_underpayment() {
        let mut ledger = setup();
        assert_eq!(
            ledger.fund(&acct(GENESIS), ether(10) - 1),
            Err(LedgerError::InsufficientFunding)
        );
        assert!(!ledger.airlines().is_funded(&acct(GENESIS)));
        assert_eq!(ledger.treasury().custody(), 0);
    }

    #[test]
    fn test_fund_only_once() {
        let mut ledger = setup_funded();
        assert_eq!(
            ledger.fund(&acct(GENESIS), ether(10)),
            Err(LedgerError::AlreadyFunded)
        );
        assert_eq!(ledger.treasury().custody(), ether(10));
    }

    #[test]
    fn test_overpayment_keeps_only_the_fee() {
        let mut ledger = setup();
        ledger.fund(&acct(GENESIS), ether(12)).unwrap();

        assert_eq!(ledger.treasury().custody(), ether(10));
        let last = ledger.events().iter().last().unwrap();
        assert_eq!(
            last.event,
            LedgerEvent::AirlineFunded {
                airline: acct(GENESIS),
                amount: ether(10),
                refunded: ether(2),
            }
        );
    }

    #[derive(Debug, Clone)]
    enum Step {
        Fund(usize),
        Register { sponsor: usize, candidate: usize },
    }

    fn arb_step() -> impl Strategy<Value = Step> {
        prop_oneof![
            (0usize..8).prop_map(Step::Fund),
            (0usize..8, 0usize..8)
                .prop_map(|(sponsor, candidate)| Step::Register { sponsor, candidate }),
        ]
    }

    proptest! {
        #[test]
        fn test_admission_invariants(steps in proptest::collection::vec(arb_step(), 1..60)) {
            let mut ledger = setup();
            let mut funded_before = std::collections::HashSet::new();

            for step in steps {
                match step {
                    Step::Fund(n) => {
                        let _ = ledger.fund(&airline(n), ether(10));
                    }
                    Step::Register { sponsor, candidate } => {
                        let count_before = ledger.airlines().registered_count();
                        let votes_before = ledger.airlines().votes_for(&airline(candidate));
                        let was_registered = ledger.airlines().is_registered(&airline(candidate));

                        let result = ledger.register_airline(&airline(sponsor), &airline(candidate));

                        if let Ok(RegistrationOutcome::Admitted) = result {
                            prop_assert!(!was_registered);
                            prop_assert!(count_before < MULTIPARTY_THRESHOLD);
                        }
                        if let Ok(RegistrationOutcome::Elected { votes, required }) = result {
                            prop_assert!(!was_registered);
                            prop_assert!(count_before >= MULTIPARTY_THRESHOLD);
                            prop_assert_eq!(required as usize, (count_before + 1) / 2);
                            prop_assert!(votes >= required);
                        }
                        if let Ok(RegistrationOutcome::VoteRecorded { votes, required }) = result {
                            prop_assert!(votes < required);
                            prop_assert!(!ledger.airlines().is_registered(&airline(candidate)));
                            prop_assert_eq!(votes as usize, votes_before + 1);
                        }
                        if result.is_err() {
                            prop_assert_eq!(ledger.airlines().registered_count(), count_before);
                            prop_assert_eq!(ledger.airlines().votes_for(&airline(candidate)), votes_before);
                        }
                    }
                }

                for n in 0..8 {
                    if funded_before.contains(&n) {
                        prop_assert!(ledger.airlines().is_funded(&airline(n)));
                    }
                    if ledger.airlines().is_funded(&airline(n)) {
                        funded_before.insert(n);
                    }
                }
            }
        }
    }
}
