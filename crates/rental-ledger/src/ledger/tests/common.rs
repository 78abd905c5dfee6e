use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::http::StatusCode;
use axum::response::Response;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;

use crate::config::LedgerConfig;
use crate::ledger::domain::{
    AdjustmentFrequency, AdjustmentType, ContractId, ContractTerms, PeriodId,
};
use crate::ledger::memory::InMemoryLedgerRepository;
use crate::ledger::registry::ContractRegistry;
use crate::ledger::repository::{
    AlertError, AlertPublisher, ContractAggregate, LedgerAlert, LedgerRepository, RepositoryError,
};
use crate::ledger::schedule::ScheduleGenerator;
use crate::ledger::service::RentalLedgerService;

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn at_noon(day: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&day.and_hms_opt(12, 0, 0).expect("valid time"))
}

/// 12-month CPI-linked contract starting January 2025: 500000/month, 5% agency, 20% agent.
pub(super) fn terms() -> ContractTerms {
    ContractTerms {
        property_ref: "prop-villa-morra-12".to_string(),
        owner_ref: "owner-benitez".to_string(),
        tenant_ref: "tenant-acosta".to_string(),
        agent_ref: "agent-gimenez".to_string(),
        start_date: "2025-01-15".to_string(),
        duration_months: 12,
        base_amount: dec!(500000),
        currency: "pyg".to_string(),
        adjustment_type: AdjustmentType::CpiIndex,
        adjustment_frequency: AdjustmentFrequency::Semiannual,
        agency_commission_percentage: dec!(5),
        agent_commission_percentage: dec!(20),
    }
}

pub(super) fn fixed_terms() -> ContractTerms {
    ContractTerms {
        adjustment_type: AdjustmentType::Fixed,
        adjustment_frequency: AdjustmentFrequency::Annual,
        ..terms()
    }
}

pub(super) fn ledger_config() -> LedgerConfig {
    LedgerConfig {
        due_day: 10,
        grace_days: 5,
    }
}

pub(super) fn aggregate(terms: ContractTerms) -> ContractAggregate {
    ContractRegistry::open(terms, &ScheduleGenerator::default(), Utc::now())
        .expect("valid terms open a contract")
}

pub(super) type MemoryService = RentalLedgerService<InMemoryLedgerRepository, MemoryAlerts>;

pub(super) fn build_service() -> (
    Arc<MemoryService>,
    Arc<InMemoryLedgerRepository>,
    Arc<MemoryAlerts>,
) {
    let repository = Arc::new(InMemoryLedgerRepository::default());
    let alerts = Arc::new(MemoryAlerts::default());
    let service = Arc::new(RentalLedgerService::new(
        repository.clone(),
        alerts.clone(),
        ledger_config(),
    ));
    (service, repository, alerts)
}

/// Create the standard contract and return its id with the ids of its periods in order.
pub(super) fn seeded(service: &MemoryService) -> (ContractId, Vec<PeriodId>) {
    let contract = service.create_contract(terms()).expect("contract created");
    let periods = service
        .get_schedule(contract.id)
        .expect("schedule available")
        .into_iter()
        .map(|period| period.id)
        .collect();
    (contract.id, periods)
}

#[derive(Default, Clone)]
pub(super) struct MemoryAlerts {
    events: Arc<Mutex<Vec<LedgerAlert>>>,
}

impl AlertPublisher for MemoryAlerts {
    fn publish(&self, alert: LedgerAlert) -> Result<(), AlertError> {
        self.events.lock().expect("alert mutex").push(alert);
        Ok(())
    }
}

impl MemoryAlerts {
    pub(super) fn events(&self) -> Vec<LedgerAlert> {
        self.events.lock().expect("alert mutex").clone()
    }
}

pub(super) struct FailingAlerts;

impl AlertPublisher for FailingAlerts {
    fn publish(&self, _alert: LedgerAlert) -> Result<(), AlertError> {
        Err(AlertError::Transport("smtp offline".to_string()))
    }
}

/// Delegates reads to an in-memory store but loses every write race.
#[derive(Default)]
pub(super) struct RacingRepository {
    pub(super) inner: InMemoryLedgerRepository,
}

impl LedgerRepository for RacingRepository {
    fn insert(&self, aggregate: ContractAggregate) -> Result<ContractAggregate, RepositoryError> {
        self.inner.insert(aggregate)
    }

    fn save(
        &self,
        _aggregate: ContractAggregate,
        _expected_version: u64,
    ) -> Result<ContractAggregate, RepositoryError> {
        Err(RepositoryError::StaleVersion)
    }

    fn fetch(&self, id: &ContractId) -> Result<Option<ContractAggregate>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn locate_period(&self, id: &PeriodId) -> Result<Option<ContractId>, RepositoryError> {
        self.inner.locate_period(id)
    }

    fn list(&self) -> Result<Vec<ContractAggregate>, RepositoryError> {
        self.inner.list()
    }
}

/// Panics inside the first `save` to stand in for a bug in the middle of a write.
#[derive(Default)]
pub(super) struct CrashingRepository {
    pub(super) inner: InMemoryLedgerRepository,
    crashed: AtomicBool,
}

impl LedgerRepository for CrashingRepository {
    fn insert(&self, aggregate: ContractAggregate) -> Result<ContractAggregate, RepositoryError> {
        self.inner.insert(aggregate)
    }

    fn save(
        &self,
        aggregate: ContractAggregate,
        expected_version: u64,
    ) -> Result<ContractAggregate, RepositoryError> {
        if !self.crashed.swap(true, Ordering::SeqCst) {
            panic!("storage driver crashed mid-write");
        }
        self.inner.save(aggregate, expected_version)
    }

    fn fetch(&self, id: &ContractId) -> Result<Option<ContractAggregate>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn locate_period(&self, id: &PeriodId) -> Result<Option<ContractId>, RepositoryError> {
        self.inner.locate_period(id)
    }

    fn list(&self) -> Result<Vec<ContractAggregate>, RepositoryError> {
        self.inner.list()
    }
}

pub(super) struct UnavailableRepository;

impl LedgerRepository for UnavailableRepository {
    fn insert(&self, _aggregate: ContractAggregate) -> Result<ContractAggregate, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn save(
        &self,
        _aggregate: ContractAggregate,
        _expected_version: u64,
    ) -> Result<ContractAggregate, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &ContractId) -> Result<Option<ContractAggregate>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn locate_period(&self, _id: &PeriodId) -> Result<Option<ContractId>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list(&self) -> Result<Vec<ContractAggregate>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn json_body(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    let value = serde_json::from_slice(&bytes).expect("json body");
    (status, value)
}

pub(super) fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(raw) => raw.parse().expect("decimal string"),
        Value::Number(number) => number.to_string().parse().expect("decimal number"),
        other => panic!("expected decimal, got {other:?}"),
    }
}
