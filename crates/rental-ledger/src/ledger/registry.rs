use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use super::commission::amount_problem;
use super::domain::{Contract, ContractId, ContractStatus, ContractTerms};
use super::error::LedgerError;
use super::repository::ContractAggregate;
use super::schedule::ScheduleGenerator;

/// Entry point for contract creation: validates terms and assembles the contract together with
/// its full schedule so both can be persisted as one unit.
pub struct ContractRegistry;

impl ContractRegistry {
    pub fn open(
        terms: ContractTerms,
        generator: &ScheduleGenerator,
        created_at: DateTime<Utc>,
    ) -> Result<ContractAggregate, LedgerError> {
        let start_date = Self::validate(&terms)?;

        let contract = Contract {
            id: ContractId::generate(),
            property_ref: terms.property_ref,
            owner_ref: terms.owner_ref,
            tenant_ref: terms.tenant_ref,
            agent_ref: terms.agent_ref,
            start_date,
            duration_months: terms.duration_months,
            base_amount: terms.base_amount,
            currency: terms.currency.trim().to_ascii_uppercase(),
            adjustment_type: terms.adjustment_type,
            adjustment_frequency: terms.adjustment_frequency,
            agency_commission_percentage: terms.agency_commission_percentage,
            agent_commission_percentage: terms.agent_commission_percentage,
            status: ContractStatus::Active,
            created_at,
        };

        let periods = generator.generate(&contract)?;

        Ok(ContractAggregate {
            contract,
            periods,
            adjustments: Vec::new(),
            reopen_audit: Vec::new(),
            version: 0,
        })
    }

    /// Check creation parameters, returning the parsed start date.
    pub fn validate(terms: &ContractTerms) -> Result<NaiveDate, LedgerError> {
        if terms.duration_months < 1 {
            return Err(invalid("duration_months", "must be at least 1"));
        }
        if terms.base_amount <= Decimal::ZERO {
            return Err(invalid("base_amount", "must be greater than zero"));
        }
        if let Some(reason) = amount_problem(terms.base_amount) {
            return Err(invalid("base_amount", &reason));
        }

        let currency = terms.currency.trim();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(invalid("currency", "must be a three-letter currency code"));
        }

        validate_percentage(
            "agency_commission_percentage",
            terms.agency_commission_percentage,
        )?;
        validate_percentage(
            "agent_commission_percentage",
            terms.agent_commission_percentage,
        )?;

        let start_date = NaiveDate::parse_from_str(terms.start_date.trim(), "%Y-%m-%d")
            .map_err(|err| invalid("start_date", &format!("must be YYYY-MM-DD ({err})")))?;

        if start_date
            .checked_add_months(chrono::Months::new(terms.duration_months))
            .is_none()
        {
            return Err(invalid(
                "duration_months",
                "extends past the supported calendar",
            ));
        }

        Ok(start_date)
    }

    /// Moves the contract to `cancelled`. Returns whether anything changed.
    pub fn cancel(aggregate: &mut ContractAggregate) -> bool {
        if aggregate.contract.status == ContractStatus::Cancelled {
            return false;
        }
        aggregate.contract.status = ContractStatus::Cancelled;
        true
    }

    /// Administrative revision of commission percentages. Settled periods keep the split they
    /// were settled with; later settlements use the new figures.
    pub fn revise_commission(
        aggregate: &mut ContractAggregate,
        agency_commission_percentage: Decimal,
        agent_commission_percentage: Decimal,
    ) -> Result<(), LedgerError> {
        aggregate.ensure_open()?;
        validate_percentage("agency_commission_percentage", agency_commission_percentage)?;
        validate_percentage("agent_commission_percentage", agent_commission_percentage)?;
        aggregate.contract.agency_commission_percentage = agency_commission_percentage;
        aggregate.contract.agent_commission_percentage = agent_commission_percentage;
        Ok(())
    }
}

fn validate_percentage(field: &'static str, value: Decimal) -> Result<(), LedgerError> {
    if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
        return Err(invalid(field, "must be between 0 and 100"));
    }
    Ok(())
}

fn invalid(field: &'static str, reason: &str) -> LedgerError {
    LedgerError::InvalidContract {
        field,
        reason: reason.to_string(),
    }
}
