use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::domain::Contract;
use super::error::LedgerError;

/// Largest rent or collection figure the ledger accepts.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(2_764_472_320, 232_830, 0, false, 0);

/// Agency/agent/owner split of one collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionSplit {
    pub agency_commission_amount: Decimal,
    pub agent_commission_amount: Decimal,
    pub owner_net_amount: Decimal,
}

pub struct CommissionCalculator;

impl CommissionCalculator {
    pub fn compute(
        contract: &Contract,
        amount_collected: Decimal,
    ) -> Result<CommissionSplit, LedgerError> {
        Self::split(
            amount_collected,
            contract.agency_commission_percentage,
            contract.agent_commission_percentage,
        )
    }

    /// The agent share is a percentage of the agency commission, not of rent, and is rounded
    /// from the unrounded agency figure. The owner keeps exactly what the rounded agency
    /// commission leaves, so the stored split never adds up to more than was collected.
    pub fn split(
        amount_collected: Decimal,
        agency_commission_percentage: Decimal,
        agent_commission_percentage: Decimal,
    ) -> Result<CommissionSplit, LedgerError> {
        let overflow = || LedgerError::InvalidAmount {
            field: "amount",
            reason: format!("commission on {amount_collected} is out of range"),
        };

        let agency = amount_collected
            .checked_mul(agency_commission_percentage)
            .and_then(|value| value.checked_div(Decimal::ONE_HUNDRED))
            .ok_or_else(overflow)?;
        let agent = agency
            .checked_mul(agent_commission_percentage)
            .and_then(|value| value.checked_div(Decimal::ONE_HUNDRED))
            .ok_or_else(overflow)?;
        let agency_commission_amount = round_currency(agency);
        let owner_net_amount = amount_collected
            .checked_sub(agency_commission_amount)
            .ok_or_else(overflow)?;

        Ok(CommissionSplit {
            agency_commission_amount,
            agent_commission_amount: round_currency(agent),
            owner_net_amount,
        })
    }
}

/// Two decimal places, half-up.
pub fn round_currency(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Money figures carry at most two decimal places and stay within [`MAX_AMOUNT`].
pub fn amount_problem(amount: Decimal) -> Option<String> {
    if amount.abs() > MAX_AMOUNT {
        return Some(format!("{amount} exceeds the ledger maximum of {MAX_AMOUNT}"));
    }
    if amount.normalize().scale() > 2 {
        return Some(format!("{amount} has more than two decimal places"));
    }
    None
}

pub fn check_amount(field: &'static str, amount: Decimal) -> Result<(), LedgerError> {
    match amount_problem(amount) {
        Some(reason) => Err(LedgerError::InvalidAmount { field, reason }),
        None => Ok(()),
    }
}
