use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::commission::{check_amount, CommissionCalculator};
use super::delinquency::DelinquencyMonitor;
use super::domain::{Contract, PaymentPeriod, PeriodId, PeriodStatus, ReopenAudit};
use super::error::LedgerError;
use super::repository::ContractAggregate;

/// Collection postings against a contract's periods.
///
/// Collection is write-once: a `collected` period only changes again through [`Self::reopen`].
pub struct PaymentLedger;

impl PaymentLedger {
    pub fn record_collection(
        aggregate: &mut ContractAggregate,
        period_id: PeriodId,
        amount: Decimal,
        collected_at: DateTime<Utc>,
    ) -> Result<PaymentPeriod, LedgerError> {
        if amount < Decimal::ZERO {
            return Err(LedgerError::InvalidAmount {
                field: "amount",
                reason: format!("collection of {amount} is negative"),
            });
        }
        check_amount("amount", amount)?;
        aggregate.ensure_open()?;

        let ContractAggregate {
            contract, periods, ..
        } = aggregate;
        let period = periods
            .iter_mut()
            .find(|period| period.id == period_id)
            .ok_or(LedgerError::PeriodNotFound(period_id))?;

        if period.status == PeriodStatus::Collected {
            return Err(LedgerError::AlreadySettled { period_id });
        }
        if amount < period.amount_collected {
            return Err(LedgerError::InvalidAmount {
                field: "amount",
                reason: format!(
                    "{amount} is below the {} already recorded for {}",
                    period.amount_collected, period.period
                ),
            });
        }

        period.amount_collected = amount;
        if amount >= period.amount_rent {
            period.collected_at = Some(collected_at);
            Self::settle(contract, period)?;
        } else if amount > Decimal::ZERO {
            period.collected_at = Some(collected_at);
            period.status = PeriodStatus::Partial;
        } else {
            period.status = DelinquencyMonitor::classify(period, collected_at.date_naive());
        }

        Ok(period.clone())
    }

    /// Administrative correction: clears settlement fields and returns the period to `pending`
    /// so the corrected amount can be posted again. The cleared values go to the audit trail.
    pub fn reopen(
        aggregate: &mut ContractAggregate,
        period_id: PeriodId,
        reason: &str,
        reopened_at: DateTime<Utc>,
    ) -> Result<PaymentPeriod, LedgerError> {
        aggregate.ensure_open()?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(LedgerError::ReasonRequired { period_id });
        }

        let ContractAggregate {
            periods,
            reopen_audit,
            ..
        } = aggregate;
        let period = periods
            .iter_mut()
            .find(|period| period.id == period_id)
            .ok_or(LedgerError::PeriodNotFound(period_id))?;

        reopen_audit.push(ReopenAudit {
            period_id,
            reason: reason.to_string(),
            previous_status: period.status,
            previous_amount_collected: period.amount_collected,
            previous_collected_at: period.collected_at,
            previous_agency_commission_amount: period.agency_commission_amount,
            previous_agent_commission_amount: period.agent_commission_amount,
            previous_owner_net_amount: period.owner_net_amount,
            reopened_at,
        });

        period.amount_collected = Decimal::ZERO;
        period.collected_at = None;
        period.agency_commission_amount = None;
        period.agent_commission_amount = None;
        period.owner_net_amount = None;
        period.status = PeriodStatus::Pending;

        Ok(period.clone())
    }

    /// Mark a fully paid period collected and store its commission split.
    pub(crate) fn settle(
        contract: &Contract,
        period: &mut PaymentPeriod,
    ) -> Result<(), LedgerError> {
        let split = CommissionCalculator::compute(contract, period.amount_collected)?;
        period.status = PeriodStatus::Collected;
        period.agency_commission_amount = Some(split.agency_commission_amount);
        period.agent_commission_amount = Some(split.agent_commission_amount);
        period.owner_net_amount = Some(split.owner_net_amount);
        Ok(())
    }
}
