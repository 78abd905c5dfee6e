use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{
    AdjustmentEvent, Contract, ContractId, ContractStatus, PaymentPeriod, PeriodId, ReopenAudit,
};
use super::error::LedgerError;

/// Contract terms plus everything that hangs off them, persisted as one unit.
///
/// `periods` are ordered by month; a period's position is its period index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractAggregate {
    pub contract: Contract,
    pub periods: Vec<PaymentPeriod>,
    pub adjustments: Vec<AdjustmentEvent>,
    pub reopen_audit: Vec<ReopenAudit>,
    pub version: u64,
}

impl ContractAggregate {
    pub fn id(&self) -> ContractId {
        self.contract.id
    }

    /// Cancelled contracts keep their collected history but their open periods are frozen.
    pub fn is_frozen(&self) -> bool {
        self.contract.status == ContractStatus::Cancelled
    }

    pub fn ensure_open(&self) -> Result<(), LedgerError> {
        if self.is_frozen() {
            return Err(LedgerError::ContractCancelled {
                contract_id: self.contract.id,
            });
        }
        Ok(())
    }

    pub fn period_index(&self, period_id: PeriodId) -> Option<usize> {
        self.periods.iter().position(|period| period.id == period_id)
    }

    pub fn period(&self, period_id: PeriodId) -> Option<&PaymentPeriod> {
        self.periods.iter().find(|period| period.id == period_id)
    }

    pub fn latest_adjustment(&self) -> Option<&AdjustmentEvent> {
        self.adjustments
            .iter()
            .max_by_key(|event| event.effective_period_index)
    }

    /// Periods that still take part in delinquency and aggregation.
    pub fn live_periods(&self) -> impl Iterator<Item = &PaymentPeriod> + '_ {
        let frozen = self.is_frozen();
        self.periods
            .iter()
            .filter(move |period| !frozen || period.is_collected())
    }
}

/// Storage abstraction with whole-aggregate writes so contract creation and every mutation
/// commit atomically.
pub trait LedgerRepository: Send + Sync {
    /// Store a new aggregate together with its full schedule.
    fn insert(&self, aggregate: ContractAggregate) -> Result<ContractAggregate, RepositoryError>;
    /// Replace an aggregate if the stored version still equals `expected_version`.
    fn save(
        &self,
        aggregate: ContractAggregate,
        expected_version: u64,
    ) -> Result<ContractAggregate, RepositoryError>;
    fn fetch(&self, id: &ContractId) -> Result<Option<ContractAggregate>, RepositoryError>;
    fn locate_period(&self, id: &PeriodId) -> Result<Option<ContractId>, RepositoryError>;
    /// Every aggregate, read from one consistent snapshot.
    fn list(&self) -> Result<Vec<ContractAggregate>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record was updated by another writer")]
    StaleVersion,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound hook for the notification collaborator (messaging, e-mail, dashboards).
pub trait AlertPublisher: Send + Sync {
    fn publish(&self, alert: LedgerAlert) -> Result<(), AlertError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    ContractDelinquent,
    ContractRecovered,
    ContractCompleted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerAlert {
    pub kind: AlertKind,
    pub contract_id: ContractId,
    pub tenant_ref: String,
    pub overdue_periods: Vec<PeriodId>,
    pub details: BTreeMap<String, String>,
}

#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    #[error("alert transport unavailable: {0}")]
    Transport(String),
}
