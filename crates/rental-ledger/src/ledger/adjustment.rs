use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info};

use super::collection::PaymentLedger;
use super::commission::check_amount;
use super::domain::{
    AdjustmentEvent, AdjustmentId, AdjustmentSource, AdjustmentType, Contract, PeriodStatus,
};
use super::error::LedgerError;
use super::repository::ContractAggregate;

/// Rent escalation rules.
///
/// Index figures (CPI, rent index) are published externally and late, so nothing escalates on
/// its own: a new base only takes effect once it is supplied through [`Self::apply_adjustment`].
pub struct RentAdjustmentEngine;

impl RentAdjustmentEngine {
    pub fn amount_for_period(
        contract: &Contract,
        period_index: u32,
        adjustment_events: &[AdjustmentEvent],
    ) -> Decimal {
        if contract.adjustment_type == AdjustmentType::Fixed {
            return contract.base_amount;
        }

        adjustment_events
            .iter()
            .filter(|event| event.effective_period_index <= period_index)
            .max_by_key(|event| event.effective_period_index)
            .map(|event| event.new_base_amount)
            .unwrap_or(contract.base_amount)
    }

    /// Period indices where the contract's cadence expects an escalation.
    pub fn scheduled_indices(contract: &Contract) -> Vec<u32> {
        if contract.adjustment_type == AdjustmentType::Fixed {
            return Vec::new();
        }

        let step = contract.adjustment_frequency.months();
        (1..)
            .map(|n| n * step)
            .take_while(|index| *index < contract.duration_months)
            .collect()
    }

    pub fn apply_adjustment(
        aggregate: &mut ContractAggregate,
        effective_period_index: u32,
        new_base_amount: Decimal,
        source: AdjustmentSource,
        applied_at: DateTime<Utc>,
    ) -> Result<AdjustmentEvent, LedgerError> {
        aggregate.ensure_open()?;

        let contract_id = aggregate.contract.id;
        let out_of_order = |reason: String| LedgerError::AdjustmentOutOfOrder {
            contract_id,
            effective_period_index,
            reason,
        };

        if new_base_amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount {
                field: "new_base_amount",
                reason: format!("{new_base_amount} must be greater than zero"),
            });
        }
        check_amount("new_base_amount", new_base_amount)?;
        if aggregate.contract.adjustment_type == AdjustmentType::Fixed {
            return Err(out_of_order("fixed-rent contracts do not escalate".to_string()));
        }

        let target = usize::try_from(effective_period_index)
            .ok()
            .and_then(|index| aggregate.periods.get(index))
            .ok_or_else(|| {
                out_of_order(format!(
                    "schedule only has {} periods",
                    aggregate.periods.len()
                ))
            })?;
        if target.status == PeriodStatus::Collected {
            return Err(out_of_order(format!(
                "period {} is already collected",
                target.period
            )));
        }
        if let Some(latest) = aggregate.latest_adjustment() {
            if effective_period_index <= latest.effective_period_index {
                return Err(out_of_order(format!(
                    "must come after the adjustment at period index {}",
                    latest.effective_period_index
                )));
            }
        }

        if !Self::scheduled_indices(&aggregate.contract).contains(&effective_period_index) {
            info!(
                contract_id = %contract_id,
                effective_period_index,
                frequency_months = aggregate.contract.adjustment_frequency.months(),
                "adjustment applied off the contract's escalation calendar"
            );
        }

        let event = AdjustmentEvent {
            id: AdjustmentId::generate(),
            contract_id,
            effective_period_index,
            new_base_amount,
            source,
            applied_at,
        };
        aggregate.adjustments.push(event.clone());

        let ContractAggregate {
            contract,
            periods,
            adjustments,
            ..
        } = aggregate;
        for (index, period) in (0u32..).zip(periods.iter_mut()) {
            if index < effective_period_index || period.is_collected() {
                continue;
            }
            period.amount_rent = Self::amount_for_period(contract, index, adjustments);
            if period.amount_collected > Decimal::ZERO
                && period.amount_collected >= period.amount_rent
            {
                debug!(period_id = %period.id, "adjusted rent covered by earlier partial collection");
                PaymentLedger::settle(contract, period)?;
            }
        }

        Ok(event)
    }
}
