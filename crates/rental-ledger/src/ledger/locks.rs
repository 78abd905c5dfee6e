use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use super::domain::ContractId;

/// Hands out one mutex per contract so writes to the same contract run one at a time while
/// writes to different contracts proceed in parallel.
#[derive(Debug, Default)]
pub(crate) struct ContractLocks {
    slots: Mutex<HashMap<ContractId, Arc<Mutex<()>>>>,
}

impl ContractLocks {
    pub(crate) fn slot(&self, contract_id: ContractId) -> Arc<Mutex<()>> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.entry(contract_id).or_default().clone()
    }
}
