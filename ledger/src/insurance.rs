//! Escrow ledger: passenger premiums, payout credits and withdrawals.
//!
//! Premiums are held in custody until the flight resolves. A `LateAirline`
//! resolution credits each uncredited policy 1.5x its premium into the
//! passenger's withdrawable balance. Withdrawal zeroes the balance before the
//! treasury moves any money.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::events::LedgerEvent;
use crate::ledger::Ledger;
use crate::types::{AccountId, Amount, FlightKey};

const PAYOUT_NUMERATOR: Amount = 3;
const PAYOUT_DENOMINATOR: Amount = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsurancePolicy {
    pub passenger: AccountId,
    pub flight: FlightKey,
    /// Total premium paid, accumulated over repeated purchases.
    pub amount_paid: Amount,
    pub credited: bool,
}

/// Payout for a premium, rounded down.
pub fn payout_for(premium: Amount) -> Option<Amount> {
    premium
        .checked_mul(PAYOUT_NUMERATOR)
        .map(|scaled| scaled / PAYOUT_DENOMINATOR)
}

#[derive(Debug, Default)]
pub struct EscrowLedger {
    policies: HashMap<FlightKey, BTreeMap<AccountId, InsurancePolicy>>,
    balances: HashMap<(AccountId, FlightKey), Amount>,
}

impl EscrowLedger {
    pub fn policy(&self, passenger: &AccountId, flight: &FlightKey) -> Option<&InsurancePolicy> {
        self.policies.get(flight).and_then(|p| p.get(passenger))
    }

    /// Policies on `flight`, ordered by passenger.
    pub fn policies_for(&self, flight: &FlightKey) -> Vec<&InsurancePolicy> {
        self.policies
            .get(flight)
            .map(|p| p.values().collect())
            .unwrap_or_default()
    }

    pub fn balance(&self, passenger: &AccountId, flight: &FlightKey) -> Amount {
        self.balances
            .get(&(passenger.clone(), flight.clone()))
            .copied()
            .unwrap_or(0)
    }

    /// Sum of every credited balance not yet withdrawn.
    pub fn outstanding(&self) -> Amount {
        self.balances
            .values()
            .fold(0, |total: Amount, b| total.saturating_add(*b))
    }

    /// Everything the ledger may have to pay out: credited balances plus the
    /// payout of every uncredited policy.
    pub fn liability(&self) -> Amount {
        let pending = self
            .policies
            .values()
            .flat_map(|p| p.values())
            .filter(|p| !p.credited)
            .filter_map(|p| payout_for(p.amount_paid))
            .fold(0, |total: Amount, payout| total.saturating_add(payout));
        self.outstanding().saturating_add(pending)
    }

    /// Computes the credits a payout on `flight` would make, without applying
    /// them. Already credited policies are skipped.
    pub(crate) fn plan_credits(
        &self,
        flight: &FlightKey,
    ) -> Result<Vec<(AccountId, Amount)>, LedgerError> {
        let Some(policies) = self.policies.get(flight) else {
            return Ok(Vec::new());
        };

        let mut plan = Vec::new();
        for policy in policies.values().filter(|p| !p.credited) {
            let payout = payout_for(policy.amount_paid).ok_or(LedgerError::AmountOverflow)?;
            self.balance(&policy.passenger, flight)
                .checked_add(payout)
                .ok_or(LedgerError::AmountOverflow)?;
            plan.push((policy.passenger.clone(), payout));
        }
        Ok(plan)
    }

    pub(crate) fn apply_credits(&mut self, flight: &FlightKey, plan: &[(AccountId, Amount)]) {
        for (passenger, payout) in plan {
            if let Some(policy) = self
                .policies
                .get_mut(flight)
                .and_then(|p| p.get_mut(passenger))
            {
                policy.credited = true;
            }
            let balance = self
                .balances
                .entry((passenger.clone(), flight.clone()))
                .or_insert(0);
            *balance = balance.saturating_add(*payout);
        }
    }
}

impl Ledger {
    /// Buy (or top up) insurance on a registered flight that has not resolved.
    pub fn buy(
        &mut self,
        passenger: &AccountId,
        flight: &FlightKey,
        value: Amount,
    ) -> Result<(), LedgerError> {
        self.gate.require_operational()?;
        if passenger.is_empty() {
            return Err(LedgerError::InvalidAccount);
        }

        let record = self.flights.get(flight).ok_or(LedgerError::FlightNotFound)?;
        if record.is_settled() {
            return Err(LedgerError::FlightAlreadySettled);
        }
        if value <= 0 {
            return Err(LedgerError::InvalidAmount);
        }

        let existing = self.escrow.policy(passenger, flight);
        if existing.is_some_and(|p| p.credited) {
            return Err(LedgerError::PolicyAlreadyCredited);
        }

        let previous = existing.map_or(0, |p| p.amount_paid);
        let total = previous
            .checked_add(value)
            .ok_or(LedgerError::AmountOverflow)?;
        let payout = payout_for(total).ok_or(LedgerError::AmountOverflow)?;
        if let Some(cap) = self.config.max_premium {
            if total > cap {
                tracing::warn!(%passenger, %flight, total, cap, "premium cap exceeded");
                return Err(LedgerError::PremiumCapExceeded);
            }
        }

        if self.config.reserve_check {
            // Outstanding balances must stay covered by custody once every policy pays.
            let liability = self
                .escrow
                .liability()
                .saturating_sub(payout_for(previous).unwrap_or(0))
                .saturating_add(payout);
            let reserves = self.treasury.custody().saturating_add(value);
            if liability > reserves {
                tracing::warn!(%passenger, %flight, liability, reserves, "insufficient reserves for policy");
                return Err(LedgerError::InsufficientReserves);
            }
        }

        self.treasury.deposit(passenger, value);
        self.escrow
            .policies
            .entry(flight.clone())
            .or_default()
            .insert(
                passenger.clone(),
                InsurancePolicy {
                    passenger: passenger.clone(),
                    flight: flight.clone(),
                    amount_paid: total,
                    credited: false,
                },
            );

        tracing::info!(%passenger, %flight, amount = value, total, "insurance purchased");
        self.publish(LedgerEvent::InsurancePurchased {
            passenger: passenger.clone(),
            airline: flight.airline.clone(),
            flight: flight.flight.clone(),
            amount: value,
        });
        Ok(())
    }

    /// Credit every uncredited policy on `flight`. Returns how many were
    /// credited; a second call for the same flight credits nothing.
    pub(crate) fn credit_insurees(&mut self, flight: &FlightKey) -> Result<usize, LedgerError> {
        let plan = self.escrow.plan_credits(flight)?;
        let credited = plan.len();
        self.escrow.apply_credits(flight, &plan);
        for (passenger, amount) in plan {
            tracing::info!(%passenger, %flight, amount, "passenger credited");
            self.publish(LedgerEvent::PassengerCredited {
                passenger,
                airline: flight.airline.clone(),
                flight: flight.flight.clone(),
                amount,
            });
        }
        Ok(credited)
    }

    /// Withdraw the caller's credited balance for `flight`.
    pub fn pay(&mut self, passenger: &AccountId, flight: &FlightKey) -> Result<Amount, LedgerError> {
        self.gate.require_operational()?;

        let key = (passenger.clone(), flight.clone());
        let amount = self.escrow.balances.get(&key).copied().unwrap_or(0);
        if amount <= 0 {
            return Err(LedgerError::NothingToWithdraw);
        }

        self.escrow.balances.insert(key.clone(), 0);
        if let Err(err) = self.treasury.transfer(passenger, amount) {
            tracing::error!(%passenger, %flight, amount, error = %err, "withdrawal transfer failed");
            self.escrow.balances.insert(key, amount);
            return Err(err.into());
        }

        tracing::info!(%passenger, %flight, amount, "funds withdrawn");
        self.publish(LedgerEvent::FundsWithdrawn {
            passenger: passenger.clone(),
            airline: flight.airline.clone(),
            flight: flight.flight.clone(),
            amount,
        });
        Ok(amount)
    }

    pub fn account_balance(&self, passenger: &AccountId, flight: &FlightKey) -> Amount {
        self.escrow.balance(passenger, flight)
    }
}
