use crate::infra::LoggingAlertPublisher;
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use clap::Args;
use rental_ledger::config::LedgerConfig;
use rental_ledger::error::AppError;
use rental_ledger::ledger::{
    AdjustmentFrequency, AdjustmentSource, AdjustmentType, CommissionCalculator, ContractRegistry,
    ContractStatus, ContractTerms, InMemoryLedgerRepository, MonthlySnapshot, PaymentPeriod,
    RentalLedgerService, ScheduleGenerator, YearMonth,
};
use rust_decimal::Decimal;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct ScheduleArgs {
    /// Contract start date (YYYY-MM-DD)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) start_date: NaiveDate,
    /// Contract duration in months
    #[arg(long)]
    pub(crate) months: u32,
    /// Monthly rent
    #[arg(long, value_parser = crate::infra::parse_amount)]
    pub(crate) amount: Decimal,
    /// Day of month rent falls due, clamped to short months
    #[arg(long, default_value_t = 10)]
    pub(crate) due_day: u32,
    /// ISO currency code
    #[arg(long, default_value = "PYG")]
    pub(crate) currency: String,
    /// Agency commission percentage of each collection
    #[arg(long, default_value = "5", value_parser = crate::infra::parse_amount)]
    pub(crate) agency_pct: Decimal,
    /// Agent share, as a percentage of the agency commission
    #[arg(long, default_value = "20", value_parser = crate::infra::parse_amount)]
    pub(crate) agent_pct: Decimal,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Contract start date (YYYY-MM-DD). Defaults to 2025-01-15.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) start_date: Option<NaiveDate>,
    /// Evaluation date for delinquency. Defaults to six days past the third due date.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

pub(crate) fn run_schedule_preview(args: ScheduleArgs) -> Result<(), AppError> {
    for line in schedule_preview(args)? {
        println!("{line}");
    }
    Ok(())
}

fn schedule_preview(args: ScheduleArgs) -> Result<Vec<String>, AppError> {
    let terms = ContractTerms {
        property_ref: "preview".to_string(),
        owner_ref: "preview".to_string(),
        tenant_ref: "preview".to_string(),
        agent_ref: "preview".to_string(),
        start_date: args.start_date.format("%Y-%m-%d").to_string(),
        duration_months: args.months,
        base_amount: args.amount,
        currency: args.currency,
        adjustment_type: AdjustmentType::Fixed,
        adjustment_frequency: AdjustmentFrequency::Annual,
        agency_commission_percentage: args.agency_pct,
        agent_commission_percentage: args.agent_pct,
    };
    let generator = ScheduleGenerator::new(args.due_day);
    let aggregate = ContractRegistry::open(terms, &generator, Utc::now())?;
    let contract = &aggregate.contract;

    let mut lines = vec![format!(
        "Schedule: {} periods of {} {} due on day {}",
        aggregate.periods.len(),
        contract.base_amount,
        contract.currency,
        generator.due_day()
    )];
    for (index, period) in aggregate.periods.iter().enumerate() {
        let split = CommissionCalculator::compute(contract, period.amount_rent)?;
        lines.push(format!(
            "  #{index:>2} {} due {} rent {} | agency {} | agent {} | owner {}",
            period.period,
            period.due_date,
            period.amount_rent,
            split.agency_commission_amount,
            split.agent_commission_amount,
            split.owner_net_amount
        ));
    }
    Ok(lines)
}

/// What the demo ended with, kept for assertions.
#[derive(Debug)]
struct DemoOutcome {
    collections: Vec<PaymentPeriod>,
    status: ContractStatus,
    snapshot: MonthlySnapshot,
    alerts: usize,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    println!("Rental ledger demo");
    let outcome = demo_walkthrough(args, LedgerConfig::default())?;
    println!(
        "Finished with contract {} after {} collection(s); {} alert(s) published; {} snapshot {}",
        outcome.status.label(),
        outcome.collections.len(),
        outcome.alerts,
        outcome.snapshot.month,
        if outcome.snapshot.is_balanced() {
            "balanced"
        } else {
            "unbalanced"
        }
    );
    Ok(())
}

fn demo_walkthrough(args: DemoArgs, config: LedgerConfig) -> Result<DemoOutcome, AppError> {
    let start_date = args
        .start_date
        .or_else(|| NaiveDate::from_ymd_opt(2025, 1, 15))
        .unwrap_or_default();

    let alerts = Arc::new(LoggingAlertPublisher::default());
    let service = RentalLedgerService::new(
        Arc::new(InMemoryLedgerRepository::default()),
        alerts.clone(),
        config,
    );

    let contract = service.create_contract(demo_terms(start_date))?;
    let schedule = service.get_schedule(contract.id)?;
    println!(
        "- Contract {} for {}: {} periods of {} {}",
        contract.id,
        contract.tenant_ref,
        schedule.len(),
        contract.base_amount,
        contract.currency
    );

    let mut collections = Vec::new();
    for period in schedule.iter().take(2) {
        let collected_at = period
            .due_date
            .and_hms_opt(12, 0, 0)
            .map(|moment| Utc.from_utc_datetime(&moment));
        let settled = service.record_payment(period.id, period.amount_rent, collected_at)?;
        println!(
            "- Collected {} on {}: agency {} | agent {} | owner {}",
            settled.period,
            settled.due_date,
            display(settled.agency_commission_amount),
            display(settled.agent_commission_amount),
            display(settled.owner_net_amount)
        );
        collections.push(settled);
    }

    let escalated = contract.base_amount * Decimal::new(12, 1);
    let adjustment =
        service.apply_adjustment(contract.id, 6, escalated, AdjustmentSource::IndexValue)?;
    println!(
        "- Rent adjusted to {} from period #{}",
        adjustment.new_base_amount, adjustment.effective_period_index
    );
    if let Err(err) = service.apply_adjustment(contract.id, 3, escalated, AdjustmentSource::Manual)
    {
        println!("  Earlier adjustment rejected: {err}");
    }

    let third = schedule.get(2).map(|period| period.due_date);
    let today = args
        .today
        .or_else(|| third.map(|due| due + Duration::days(6)))
        .unwrap_or(start_date);
    let refreshed = service.refresh_status(contract.id, today)?;
    println!("- Status as of {today}: {}", refreshed.status.label());

    for overdue in service.overdue_periods(today)? {
        println!(
            "  Overdue {} ({} days): {} outstanding",
            overdue.period, overdue.days_overdue, overdue.outstanding
        );
    }

    let snapshot = service.monthly_snapshot(YearMonth::of(today), today)?;
    println!(
        "- Snapshot {}: expected {} | collected {} | pending {} | delayed {} | agency net {}",
        snapshot.month,
        snapshot.expected,
        snapshot.collected,
        snapshot.pending,
        snapshot.delayed,
        snapshot.agency_net
    );

    Ok(DemoOutcome {
        collections,
        status: refreshed.status,
        snapshot,
        alerts: alerts.events().len(),
    })
}

fn demo_terms(start_date: NaiveDate) -> ContractTerms {
    ContractTerms {
        property_ref: "prop-villa-morra-12".to_string(),
        owner_ref: "owner-benitez".to_string(),
        tenant_ref: "tenant-acosta".to_string(),
        agent_ref: "agent-gimenez".to_string(),
        start_date: start_date.format("%Y-%m-%d").to_string(),
        duration_months: 12,
        base_amount: Decimal::new(500000, 0),
        currency: "PYG".to_string(),
        adjustment_type: AdjustmentType::CpiIndex,
        adjustment_frequency: AdjustmentFrequency::Semiannual,
        agency_commission_percentage: Decimal::new(5, 0),
        agent_commission_percentage: Decimal::new(20, 0),
    }
}

fn display(amount: Option<Decimal>) -> String {
    amount.map_or_else(|| "-".to_string(), |value| value.to_string())
}
