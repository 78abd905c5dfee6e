use super::domain::{ContractId, PeriodId};
use super::repository::RepositoryError;

/// Typed failures returned by every ledger operation. Nothing is retried internally.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("invalid contract: {field} {reason}")]
    InvalidContract { field: &'static str, reason: String },
    #[error("invalid amount for {field}: {reason}")]
    InvalidAmount { field: &'static str, reason: String },
    #[error("period {period_id} is already settled; reopen it before posting a new collection")]
    AlreadySettled { period_id: PeriodId },
    #[error("payment period {0} not found")]
    PeriodNotFound(PeriodId),
    #[error("contract {0} not found")]
    ContractNotFound(ContractId),
    #[error("adjustment at period index {effective_period_index} rejected: {reason}")]
    AdjustmentOutOfOrder {
        contract_id: ContractId,
        effective_period_index: u32,
        reason: String,
    },
    #[error("contract {contract_id} was modified concurrently; re-read and retry")]
    ConcurrentModification { contract_id: ContractId },
    #[error("contract {contract_id} is cancelled and its schedule is frozen")]
    ContractCancelled { contract_id: ContractId },
    #[error("reopening period {period_id} requires a reason")]
    ReasonRequired { period_id: PeriodId },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl LedgerError {
    /// Stable discriminator surfaced to API consumers.
    pub const fn kind(&self) -> &'static str {
        match self {
            LedgerError::InvalidContract { .. } => "invalid_contract",
            LedgerError::InvalidAmount { .. } => "invalid_amount",
            LedgerError::AlreadySettled { .. } => "already_settled",
            LedgerError::PeriodNotFound(_) => "period_not_found",
            LedgerError::ContractNotFound(_) => "contract_not_found",
            LedgerError::AdjustmentOutOfOrder { .. } => "adjustment_out_of_order",
            LedgerError::ConcurrentModification { .. } => "concurrent_modification",
            LedgerError::ContractCancelled { .. } => "contract_cancelled",
            LedgerError::ReasonRequired { .. } => "reason_required",
            LedgerError::Repository(_) => "repository",
        }
    }

    pub fn retryable(&self) -> bool {
        match self {
            LedgerError::ConcurrentModification { .. } => true,
            LedgerError::Repository(err) => matches!(err, RepositoryError::Unavailable(_)),
            _ => false,
        }
    }
}
