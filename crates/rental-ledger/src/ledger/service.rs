use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError};

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

use super::adjustment::RentAdjustmentEngine;
use super::collection::PaymentLedger;
use super::commission::round_currency;
use super::delinquency::{DelinquencyMonitor, MonthlySnapshot, OverduePeriod};
use super::domain::{
    AdjustmentEvent, AdjustmentSource, Contract, ContractId, ContractStatus, ContractTerms,
    PaymentPeriod, PeriodId, YearMonth,
};
use super::error::LedgerError;
use super::lifecycle::{ContractStatusMachine, StatusTransition};
use super::locks::ContractLocks;
use super::registry::ContractRegistry;
use super::repository::{
    AlertKind, AlertPublisher, ContractAggregate, LedgerAlert, LedgerRepository, RepositoryError,
};
use super::schedule::ScheduleGenerator;
use crate::config::LedgerConfig;

/// Domain-service entry point: every mutation runs inside the contract's exclusive section and
/// commits the whole aggregate; reads work from repository snapshots without locking.
pub struct RentalLedgerService<R, A> {
    repository: Arc<R>,
    alerts: Arc<A>,
    locks: ContractLocks,
    schedule: ScheduleGenerator,
    lifecycle: ContractStatusMachine,
}

/// Contract plus its running totals.
#[derive(Debug, Clone, Serialize)]
pub struct ContractView {
    pub contract: Contract,
    pub summary: ContractSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContractSummary {
    pub periods_total: usize,
    pub periods_collected: usize,
    pub expected: Decimal,
    pub collected: Decimal,
    pub outstanding: Decimal,
    pub agency_commission: Decimal,
    pub adjustments: usize,
    pub reopened: usize,
}

impl ContractSummary {
    fn from_aggregate(aggregate: &ContractAggregate) -> Self {
        let periods = &aggregate.periods;

        Self {
            periods_total: periods.len(),
            periods_collected: periods.iter().filter(|p| p.is_collected()).count(),
            expected: total(periods, |period| period.amount_rent),
            collected: total(periods, |period| period.amount_collected),
            outstanding: total(periods, PaymentPeriod::outstanding),
            agency_commission: total(periods, |period| {
                period.agency_commission_amount.unwrap_or_default()
            }),
            adjustments: aggregate.adjustments.len(),
            reopened: aggregate.reopen_audit.len(),
        }
    }
}

fn total(periods: &[PaymentPeriod], value: impl Fn(&PaymentPeriod) -> Decimal) -> Decimal {
    round_currency(
        periods
            .iter()
            .map(value)
            .fold(Decimal::ZERO, Decimal::saturating_add),
    )
}

impl<R, A> RentalLedgerService<R, A>
where
    R: LedgerRepository + 'static,
    A: AlertPublisher + 'static,
{
    pub fn new(repository: Arc<R>, alerts: Arc<A>, config: LedgerConfig) -> Self {
        Self {
            repository,
            alerts,
            locks: ContractLocks::default(),
            schedule: ScheduleGenerator::new(config.due_day),
            lifecycle: ContractStatusMachine::new(config.grace_days),
        }
    }

    pub fn schedule_generator(&self) -> &ScheduleGenerator {
        &self.schedule
    }

    pub fn status_machine(&self) -> &ContractStatusMachine {
        &self.lifecycle
    }

    /// Validate terms and persist the contract with its full schedule in one write.
    pub fn create_contract(&self, terms: ContractTerms) -> Result<Contract, LedgerError> {
        let aggregate = ContractRegistry::open(terms, &self.schedule, Utc::now()).map_err(|err| {
            warn!(error = %err, "contract creation rejected");
            err
        })?;
        let stored = self.repository.insert(aggregate)?;

        info!(
            contract_id = %stored.contract.id,
            periods = stored.periods.len(),
            base_amount = %stored.contract.base_amount,
            currency = %stored.contract.currency,
            "contract created"
        );
        Ok(stored.contract)
    }

    pub fn contract(&self, contract_id: ContractId) -> Result<ContractView, LedgerError> {
        let aggregate = self.load(contract_id)?;
        Ok(ContractView {
            summary: ContractSummary::from_aggregate(&aggregate),
            contract: aggregate.contract,
        })
    }

    pub fn aggregate(&self, contract_id: ContractId) -> Result<ContractAggregate, LedgerError> {
        self.load(contract_id)
    }

    /// Periods as stored, ordered by month.
    pub fn get_schedule(&self, contract_id: ContractId) -> Result<Vec<PaymentPeriod>, LedgerError> {
        Ok(self.load(contract_id)?.periods)
    }

    /// Periods with their status derived for `as_of`.
    pub fn schedule_as_of(
        &self,
        contract_id: ContractId,
        as_of: NaiveDate,
    ) -> Result<Vec<PaymentPeriod>, LedgerError> {
        let aggregate = self.load(contract_id)?;
        Ok(aggregate
            .periods
            .iter()
            .map(|period| DelinquencyMonitor::classified(period, as_of))
            .collect())
    }

    pub fn record_payment(
        &self,
        period_id: PeriodId,
        amount: Decimal,
        collected_at: Option<DateTime<Utc>>,
    ) -> Result<PaymentPeriod, LedgerError> {
        let contract_id = self.locate(period_id)?;
        let collected_at = collected_at.unwrap_or_else(Utc::now);

        let period = self
            .mutate(contract_id, |aggregate| {
                PaymentLedger::record_collection(aggregate, period_id, amount, collected_at)
            })
            .map_err(|err| {
                warn!(%contract_id, %period_id, %amount, error = %err, "collection rejected");
                err
            })?;

        info!(
            %contract_id,
            %period_id,
            %amount,
            status = period.status.label(),
            "collection recorded"
        );
        Ok(period)
    }

    pub fn reopen_payment(
        &self,
        period_id: PeriodId,
        reason: &str,
    ) -> Result<PaymentPeriod, LedgerError> {
        let contract_id = self.locate(period_id)?;
        let period = self.mutate(contract_id, |aggregate| {
            PaymentLedger::reopen(aggregate, period_id, reason, Utc::now())
        })?;

        info!(%contract_id, %period_id, reason = reason.trim(), "period reopened");
        Ok(period)
    }

    pub fn apply_adjustment(
        &self,
        contract_id: ContractId,
        effective_period_index: u32,
        new_base_amount: Decimal,
        source: AdjustmentSource,
    ) -> Result<AdjustmentEvent, LedgerError> {
        let event = self
            .mutate(contract_id, |aggregate| {
                RentAdjustmentEngine::apply_adjustment(
                    aggregate,
                    effective_period_index,
                    new_base_amount,
                    source,
                    Utc::now(),
                )
            })
            .map_err(|err| {
                warn!(%contract_id, effective_period_index, error = %err, "adjustment rejected");
                err
            })?;

        info!(
            %contract_id,
            effective_period_index,
            %new_base_amount,
            ?source,
            "rent adjustment applied"
        );
        Ok(event)
    }

    pub fn revise_commission(
        &self,
        contract_id: ContractId,
        agency_commission_percentage: Decimal,
        agent_commission_percentage: Decimal,
    ) -> Result<Contract, LedgerError> {
        let contract = self.mutate(contract_id, |aggregate| {
            ContractRegistry::revise_commission(
                aggregate,
                agency_commission_percentage,
                agent_commission_percentage,
            )?;
            Ok(aggregate.contract.clone())
        })?;

        info!(
            %contract_id,
            %agency_commission_percentage,
            %agent_commission_percentage,
            "commission percentages revised"
        );
        Ok(contract)
    }

    /// Terminal and idempotent.
    pub fn cancel_contract(&self, contract_id: ContractId) -> Result<Contract, LedgerError> {
        let mut changed = false;
        let contract = self.mutate(contract_id, |aggregate| {
            changed = ContractRegistry::cancel(aggregate);
            Ok(aggregate.contract.clone())
        })?;

        if changed {
            info!(%contract_id, "contract cancelled");
        }
        Ok(contract)
    }

    /// Run the status machine for one contract and persist the result.
    pub fn refresh_status(
        &self,
        contract_id: ContractId,
        as_of: NaiveDate,
    ) -> Result<Contract, LedgerError> {
        let (aggregate, transition) = self.mutate(contract_id, |aggregate| {
            let transition = self.lifecycle.advance(aggregate, as_of);
            Ok((aggregate.clone(), transition))
        })?;

        if let Some(transition) = transition {
            self.announce(&aggregate, transition, as_of);
        }
        Ok(aggregate.contract)
    }

    /// Refresh every contract that is not cancelled, returning the transitions that happened.
    pub fn refresh_all(
        &self,
        as_of: NaiveDate,
    ) -> Result<Vec<(ContractId, StatusTransition)>, LedgerError> {
        let mut transitions = Vec::new();
        for aggregate in self.repository.list()? {
            if aggregate.is_frozen() {
                continue;
            }
            let before = aggregate.contract.status;
            let contract = self.refresh_status(aggregate.id(), as_of)?;
            if contract.status != before {
                transitions.push((
                    contract.id,
                    StatusTransition {
                        from: before,
                        to: contract.status,
                    },
                ));
            }
        }
        Ok(transitions)
    }

    pub fn monthly_snapshot(
        &self,
        month: YearMonth,
        as_of: NaiveDate,
    ) -> Result<MonthlySnapshot, LedgerError> {
        let aggregates = self.repository.list()?;
        let periods = aggregates.iter().flat_map(ContractAggregate::live_periods);
        Ok(DelinquencyMonitor::monthly_snapshot(periods, month, as_of))
    }

    /// Overdue periods across all contracts, oldest due date first.
    pub fn overdue_periods(&self, as_of: NaiveDate) -> Result<Vec<OverduePeriod>, LedgerError> {
        let mut overdue: Vec<OverduePeriod> = self
            .repository
            .list()?
            .iter()
            .flat_map(|aggregate| DelinquencyMonitor::overdue_periods(aggregate, as_of))
            .collect();
        overdue.sort_by(|left, right| {
            left.due_date
                .cmp(&right.due_date)
                .then_with(|| left.tenant_ref.cmp(&right.tenant_ref))
        });
        Ok(overdue)
    }

    fn load(&self, contract_id: ContractId) -> Result<ContractAggregate, LedgerError> {
        self.repository
            .fetch(&contract_id)?
            .ok_or(LedgerError::ContractNotFound(contract_id))
    }

    fn locate(&self, period_id: PeriodId) -> Result<ContractId, LedgerError> {
        self.repository
            .locate_period(&period_id)?
            .ok_or(LedgerError::PeriodNotFound(period_id))
    }

    /// Exclusive read -> compute -> persist section for one contract.
    ///
    /// Nothing reaches the repository before `save`, so a section that panicked left storage
    /// untouched and its poisoned lock is taken over rather than refused.
    fn mutate<T, F>(&self, contract_id: ContractId, operation: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&mut ContractAggregate) -> Result<T, LedgerError>,
    {
        let slot = self.locks.slot(contract_id);
        let _exclusive = slot.lock().unwrap_or_else(PoisonError::into_inner);

        let mut aggregate = self.load(contract_id)?;
        let expected_version = aggregate.version;
        let outcome = operation(&mut aggregate)?;

        self.repository
            .save(aggregate, expected_version)
            .map_err(|err| match err {
                RepositoryError::StaleVersion => LedgerError::ConcurrentModification { contract_id },
                other => LedgerError::Repository(other),
            })?;
        Ok(outcome)
    }

    fn announce(&self, aggregate: &ContractAggregate, transition: StatusTransition, as_of: NaiveDate) {
        let kind = match (transition.from, transition.to) {
            (_, ContractStatus::Delinquent) => AlertKind::ContractDelinquent,
            (ContractStatus::Delinquent, ContractStatus::Active) => AlertKind::ContractRecovered,
            (_, ContractStatus::Completed) => AlertKind::ContractCompleted,
            _ => return,
        };

        let overdue = DelinquencyMonitor::overdue_periods(aggregate, as_of);
        let outstanding: Decimal = overdue.iter().map(|period| period.outstanding).sum();
        let mut details = BTreeMap::new();
        details.insert("from".to_string(), transition.from.label().to_string());
        details.insert("to".to_string(), transition.to.label().to_string());
        details.insert("as_of".to_string(), as_of.to_string());
        details.insert("outstanding".to_string(), round_currency(outstanding).to_string());
        details.insert("currency".to_string(), aggregate.contract.currency.clone());

        let alert = LedgerAlert {
            kind,
            contract_id: aggregate.contract.id,
            tenant_ref: aggregate.contract.tenant_ref.clone(),
            overdue_periods: overdue.iter().map(|period| period.period_id).collect(),
            details,
        };

        if let Err(err) = self.alerts.publish(alert) {
            warn!(contract_id = %aggregate.contract.id, error = %err, "ledger alert dispatch failed");
        }
    }
}
