use rust_decimal::Decimal;

use super::adjustment::RentAdjustmentEngine;
use super::domain::{Contract, PaymentPeriod, PeriodId, PeriodStatus};
use super::error::LedgerError;

pub const DEFAULT_DUE_DAY: u32 = 10;

/// Expands contract terms into one pending period per contract month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleGenerator {
    due_day: u32,
}

impl Default for ScheduleGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_DUE_DAY)
    }
}

impl ScheduleGenerator {
    pub fn new(due_day: u32) -> Self {
        Self {
            due_day: due_day.clamp(1, 31),
        }
    }

    pub fn due_day(&self) -> u32 {
        self.due_day
    }

    /// Nominal schedule at creation: no adjustment events exist yet, so every period carries
    /// the contract's base amount.
    pub fn generate(&self, contract: &Contract) -> Result<Vec<PaymentPeriod>, LedgerError> {
        let first = contract.first_month();

        (0..contract.duration_months)
            .map(|index| {
                let period = first.checked_add_months(index).ok_or_else(|| {
                    LedgerError::InvalidContract {
                        field: "duration_months",
                        reason: "extends past the supported calendar".to_string(),
                    }
                })?;

                Ok(PaymentPeriod {
                    id: PeriodId::generate(),
                    contract_id: contract.id,
                    period,
                    due_date: period.day_clamped(self.due_day),
                    amount_rent: RentAdjustmentEngine::amount_for_period(contract, index, &[]),
                    amount_collected: Decimal::ZERO,
                    collected_at: None,
                    status: PeriodStatus::Pending,
                    agency_commission_amount: None,
                    agent_commission_amount: None,
                    owner_net_amount: None,
                })
            })
            .collect()
    }
}
