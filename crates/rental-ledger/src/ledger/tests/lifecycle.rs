use super::common::*;
use crate::ledger::collection::PaymentLedger;
use crate::ledger::domain::ContractStatus;
use crate::ledger::lifecycle::{ContractStatusMachine, StatusTransition};
use crate::ledger::registry::ContractRegistry;
use crate::ledger::{LedgerError, MAX_AMOUNT};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn collect_all(aggregate: &mut crate::ledger::repository::ContractAggregate) {
    let ids: Vec<_> = aggregate.periods.iter().map(|p| (p.id, p.due_date)).collect();
    for (period_id, due) in ids {
        PaymentLedger::record_collection(aggregate, period_id, dec!(500000), at_noon(due))
            .expect("collection accepted");
    }
}

#[test]
fn grace_window_separates_overdue_from_delinquent() {
    let machine = ContractStatusMachine::new(5);
    let mut aggregate = aggregate(terms());
    for index in 0..2 {
        let id = aggregate.periods[index].id;
        let due = aggregate.periods[index].due_date;
        PaymentLedger::record_collection(&mut aggregate, id, dec!(500000), at_noon(due))
            .expect("collection accepted");
    }
    let march_due = aggregate.periods[2].due_date;

    let within_grace = march_due + chrono::Duration::days(5);
    let past_grace = march_due + chrono::Duration::days(6);

    assert_eq!(
        machine.derive(&aggregate.contract, &aggregate.periods, within_grace),
        ContractStatus::Active
    );
    assert_eq!(
        machine.derive(&aggregate.contract, &aggregate.periods, past_grace),
        ContractStatus::Delinquent
    );
}

#[test]
fn delinquent_contract_recovers_when_arrears_clear() {
    let machine = ContractStatusMachine::default();
    let mut aggregate = aggregate(terms());
    let as_of = date(2025, 1, 20);

    assert_eq!(
        machine.advance(&mut aggregate, as_of),
        Some(StatusTransition {
            from: ContractStatus::Active,
            to: ContractStatus::Delinquent,
        })
    );
    assert_eq!(machine.advance(&mut aggregate, as_of), None);

    let january = aggregate.periods[0].id;
    PaymentLedger::record_collection(&mut aggregate, january, dec!(500000), at_noon(as_of))
        .expect("collection accepted");

    assert_eq!(
        machine.advance(&mut aggregate, as_of),
        Some(StatusTransition {
            from: ContractStatus::Delinquent,
            to: ContractStatus::Active,
        })
    );
}

#[test]
fn completes_only_after_term_with_everything_collected() {
    let machine = ContractStatusMachine::default();
    let mut aggregate = aggregate(terms());
    collect_all(&mut aggregate);

    // term runs 2025-01-15 + 12 months
    assert_eq!(
        machine.derive(&aggregate.contract, &aggregate.periods, date(2026, 1, 15)),
        ContractStatus::Active
    );
    assert_eq!(
        machine.derive(&aggregate.contract, &aggregate.periods, date(2026, 1, 16)),
        ContractStatus::Completed
    );
}

#[test]
fn unpaid_period_blocks_completion() {
    let machine = ContractStatusMachine::default();
    let mut aggregate = aggregate(terms());
    collect_all(&mut aggregate);
    let last = aggregate.periods[11].id;
    PaymentLedger::reopen(&mut aggregate, last, "chargeback", at_noon(date(2025, 12, 20)))
        .expect("reopen accepted");

    assert_eq!(
        machine.derive(&aggregate.contract, &aggregate.periods, date(2026, 2, 1)),
        ContractStatus::Delinquent
    );
}

#[test]
fn cancelled_is_terminal() {
    let machine = ContractStatusMachine::default();
    let mut aggregate = aggregate(terms());
    ContractRegistry::cancel(&mut aggregate);

    assert_eq!(machine.advance(&mut aggregate, date(2025, 6, 1)), None);
    assert_eq!(aggregate.contract.status, ContractStatus::Cancelled);
}

#[test]
fn registry_names_the_field_of_unusable_rent() {
    let rejected_field = |base_amount| {
        let mut terms = terms();
        terms.base_amount = base_amount;
        match ContractRegistry::validate(&terms) {
            Err(LedgerError::InvalidContract { field, .. }) => field,
            other => panic!("expected invalid contract, got {other:?}"),
        }
    };

    assert_eq!(rejected_field(Decimal::MAX), "base_amount");
    assert_eq!(rejected_field(MAX_AMOUNT + Decimal::ONE), "base_amount");
    assert_eq!(rejected_field(dec!(500000.125)), "base_amount");
    assert_eq!(rejected_field(dec!(-1)), "base_amount");

    let mut ceiling = terms();
    ceiling.base_amount = MAX_AMOUNT;
    assert!(ContractRegistry::validate(&ceiling).is_ok());
}
