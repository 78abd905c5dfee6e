use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::domain::{ContractId, PeriodId};
use super::repository::{ContractAggregate, LedgerRepository, RepositoryError};

#[derive(Debug, Default)]
struct LedgerState {
    contracts: HashMap<ContractId, ContractAggregate>,
    periods: HashMap<PeriodId, ContractId>,
}

/// Process-local repository. Readers share the lock and see whole aggregates only.
#[derive(Debug, Default, Clone)]
pub struct InMemoryLedgerRepository {
    state: Arc<RwLock<LedgerState>>,
}

fn poisoned<T>(_: T) -> RepositoryError {
    RepositoryError::Unavailable("ledger state lock poisoned".to_string())
}

impl LedgerRepository for InMemoryLedgerRepository {
    fn insert(&self, aggregate: ContractAggregate) -> Result<ContractAggregate, RepositoryError> {
        let mut guard = self.state.write().map_err(poisoned)?;
        let id = aggregate.id();
        if guard.contracts.contains_key(&id)
            || aggregate
                .periods
                .iter()
                .any(|period| guard.periods.contains_key(&period.id))
        {
            return Err(RepositoryError::Conflict);
        }

        for period in &aggregate.periods {
            guard.periods.insert(period.id, id);
        }
        guard.contracts.insert(id, aggregate.clone());
        Ok(aggregate)
    }

    fn save(
        &self,
        mut aggregate: ContractAggregate,
        expected_version: u64,
    ) -> Result<ContractAggregate, RepositoryError> {
        let mut guard = self.state.write().map_err(poisoned)?;
        let stored = guard
            .contracts
            .get_mut(&aggregate.id())
            .ok_or(RepositoryError::NotFound)?;
        if stored.version != expected_version {
            return Err(RepositoryError::StaleVersion);
        }

        aggregate.version = expected_version + 1;
        *stored = aggregate.clone();
        Ok(aggregate)
    }

    fn fetch(&self, id: &ContractId) -> Result<Option<ContractAggregate>, RepositoryError> {
        let guard = self.state.read().map_err(poisoned)?;
        Ok(guard.contracts.get(id).cloned())
    }

    fn locate_period(&self, id: &PeriodId) -> Result<Option<ContractId>, RepositoryError> {
        let guard = self.state.read().map_err(poisoned)?;
        Ok(guard.periods.get(id).copied())
    }

    fn list(&self) -> Result<Vec<ContractAggregate>, RepositoryError> {
        let guard = self.state.read().map_err(poisoned)?;
        let mut aggregates: Vec<ContractAggregate> = guard.contracts.values().cloned().collect();
        aggregates.sort_by(|left, right| {
            left.contract
                .created_at
                .cmp(&right.contract.created_at)
                .then_with(|| left.contract.id.cmp(&right.contract.id))
        });
        Ok(aggregates)
    }
}
