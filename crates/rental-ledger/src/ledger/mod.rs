//! Contract schedule, collection, escalation, commission, and delinquency engine.
//!
//! Pure rules live in the component modules (`schedule`, `adjustment`, `collection`,
//! `commission`, `delinquency`, `lifecycle`) and operate on a [`ContractAggregate`]. The
//! [`RentalLedgerService`] wraps them with per-contract exclusive sections and whole-aggregate
//! persistence so every invariant is enforced server-side regardless of the caller.

pub mod adjustment;
pub mod collection;
pub mod commission;
pub mod delinquency;
pub mod domain;
mod error;
pub mod lifecycle;
mod locks;
pub mod memory;
pub mod registry;
pub mod repository;
pub mod router;
pub mod schedule;
pub mod service;

#[cfg(test)]
mod tests;

pub use adjustment::RentAdjustmentEngine;
pub use collection::PaymentLedger;
pub use commission::{
    amount_problem, check_amount, round_currency, CommissionCalculator, CommissionSplit,
    MAX_AMOUNT,
};
pub use delinquency::{DelinquencyMonitor, MonthlySnapshot, OverduePeriod};
pub use domain::{
    AdjustmentEvent, AdjustmentFrequency, AdjustmentId, AdjustmentSource, AdjustmentType,
    Contract, ContractId, ContractStatus, ContractTerms, PaymentPeriod, PeriodId, PeriodStatus,
    ReopenAudit, YearMonth, YearMonthParseError,
};
pub use error::LedgerError;
pub use lifecycle::{ContractStatusMachine, StatusTransition};
pub use memory::InMemoryLedgerRepository;
pub use registry::ContractRegistry;
pub use repository::{
    AlertError, AlertKind, AlertPublisher, ContractAggregate, LedgerAlert, LedgerRepository,
    RepositoryError,
};
pub use router::ledger_router;
pub use schedule::ScheduleGenerator;
pub use service::{ContractSummary, ContractView, RentalLedgerService};
