use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::delinquency::DEFAULT_GRACE_DAYS;
use super::domain::{Contract, ContractStatus, PaymentPeriod};
use super::repository::ContractAggregate;

/// Contract-level state derived from the ledger.
///
/// `active <-> delinquent`, either of them to `completed` once the term is over and every
/// period is collected. `cancelled` only comes from an administrative action and is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractStatusMachine {
    grace_days: i64,
}

impl Default for ContractStatusMachine {
    fn default() -> Self {
        Self::new(DEFAULT_GRACE_DAYS)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTransition {
    pub from: ContractStatus,
    pub to: ContractStatus,
}

impl ContractStatusMachine {
    pub fn new(grace_days: i64) -> Self {
        Self {
            grace_days: grace_days.max(0),
        }
    }

    pub fn grace_days(&self) -> i64 {
        self.grace_days
    }

    pub fn derive(
        &self,
        contract: &Contract,
        periods: &[PaymentPeriod],
        as_of: NaiveDate,
    ) -> ContractStatus {
        if contract.status == ContractStatus::Cancelled {
            return ContractStatus::Cancelled;
        }

        let term_over = contract.end_date().is_some_and(|end| as_of > end);
        if term_over && periods.iter().all(PaymentPeriod::is_collected) {
            return ContractStatus::Completed;
        }

        if periods
            .iter()
            .any(|period| self.past_grace(period, as_of))
        {
            ContractStatus::Delinquent
        } else {
            ContractStatus::Active
        }
    }

    /// An uncollected period whose due date is more than the grace window behind `as_of`.
    pub fn past_grace(&self, period: &PaymentPeriod, as_of: NaiveDate) -> bool {
        !period.is_collected() && (as_of - period.due_date).num_days() > self.grace_days
    }

    /// Apply the derived status to the aggregate, reporting the change if there was one.
    pub fn advance(
        &self,
        aggregate: &mut ContractAggregate,
        as_of: NaiveDate,
    ) -> Option<StatusTransition> {
        let from = aggregate.contract.status;
        let to = self.derive(&aggregate.contract, &aggregate.periods, as_of);
        if from == to {
            return None;
        }
        aggregate.contract.status = to;
        Some(StatusTransition { from, to })
    }
}
