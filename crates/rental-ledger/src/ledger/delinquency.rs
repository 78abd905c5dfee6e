use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::commission::round_currency;
use super::domain::{ContractId, PaymentPeriod, PeriodId, PeriodStatus, YearMonth};
use super::repository::ContractAggregate;

pub const DEFAULT_GRACE_DAYS: i64 = 5;

/// Derives clock-relative period state. Overdue is never trusted from storage; it is recomputed
/// against the caller's reference date on every read.
pub struct DelinquencyMonitor;

/// Monthly KPIs for dashboards. `expected == collected + pending + delayed` for any period set;
/// money received beyond a period's rent is reported separately as `surplus`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlySnapshot {
    pub month: YearMonth,
    pub as_of: NaiveDate,
    pub periods: usize,
    pub expected: Decimal,
    pub collected: Decimal,
    pub pending: Decimal,
    pub delayed: Decimal,
    pub agency_net: Decimal,
    pub surplus: Decimal,
}

impl MonthlySnapshot {
    pub fn is_balanced(&self) -> bool {
        self.expected == self.collected + self.pending + self.delayed
    }
}

/// One row of the overdue report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverduePeriod {
    pub contract_id: ContractId,
    pub period_id: PeriodId,
    pub tenant_ref: String,
    pub period: YearMonth,
    pub due_date: NaiveDate,
    pub days_overdue: i64,
    pub outstanding: Decimal,
    pub status: PeriodStatus,
}

impl DelinquencyMonitor {
    pub fn classify(period: &PaymentPeriod, as_of: NaiveDate) -> PeriodStatus {
        if period.status == PeriodStatus::Collected {
            PeriodStatus::Collected
        } else if period.due_date < as_of {
            PeriodStatus::Overdue
        } else if period.amount_collected > Decimal::ZERO {
            PeriodStatus::Partial
        } else {
            PeriodStatus::Pending
        }
    }

    /// Copy of the period with its status derived for `as_of`.
    pub fn classified(period: &PaymentPeriod, as_of: NaiveDate) -> PaymentPeriod {
        PaymentPeriod {
            status: Self::classify(period, as_of),
            ..period.clone()
        }
    }

    pub fn monthly_snapshot<'a, I>(periods: I, month: YearMonth, as_of: NaiveDate) -> MonthlySnapshot
    where
        I: IntoIterator<Item = &'a PaymentPeriod>,
    {
        let mut snapshot = MonthlySnapshot {
            month,
            as_of,
            periods: 0,
            expected: Decimal::ZERO,
            collected: Decimal::ZERO,
            pending: Decimal::ZERO,
            delayed: Decimal::ZERO,
            agency_net: Decimal::ZERO,
            surplus: Decimal::ZERO,
        };

        for period in periods.into_iter().filter(|period| period.period == month) {
            snapshot.periods += 1;
            snapshot.expected = snapshot.expected.saturating_add(period.amount_rent);

            let received = period.amount_collected.min(period.amount_rent);
            snapshot.collected = snapshot.collected.saturating_add(received);
            snapshot.surplus = snapshot
                .surplus
                .saturating_add(period.amount_collected - received);

            match Self::classify(period, as_of) {
                PeriodStatus::Collected => {
                    let agency = period.agency_commission_amount.unwrap_or_default();
                    snapshot.agency_net = snapshot.agency_net.saturating_add(agency);
                }
                PeriodStatus::Overdue => {
                    snapshot.delayed = snapshot.delayed.saturating_add(period.outstanding())
                }
                PeriodStatus::Pending | PeriodStatus::Partial => {
                    snapshot.pending = snapshot.pending.saturating_add(period.outstanding())
                }
            }
        }

        snapshot.expected = round_currency(snapshot.expected);
        snapshot.collected = round_currency(snapshot.collected);
        snapshot.pending = round_currency(snapshot.pending);
        snapshot.delayed = round_currency(snapshot.delayed);
        snapshot.agency_net = round_currency(snapshot.agency_net);
        snapshot.surplus = round_currency(snapshot.surplus);
        snapshot
    }

    /// Every live period of the contract whose due date has passed without full collection.
    pub fn overdue_periods(aggregate: &ContractAggregate, as_of: NaiveDate) -> Vec<OverduePeriod> {
        aggregate
            .live_periods()
            .filter(|period| Self::classify(period, as_of) == PeriodStatus::Overdue)
            .map(|period| OverduePeriod {
                contract_id: aggregate.contract.id,
                period_id: period.id,
                tenant_ref: aggregate.contract.tenant_ref.clone(),
                period: period.period,
                due_date: period.due_date,
                days_overdue: (as_of - period.due_date).num_days(),
                outstanding: period.outstanding(),
                status: PeriodStatus::Overdue,
            })
            .collect()
    }
}
