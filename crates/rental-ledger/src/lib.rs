//! Financial engine for signed rental agreements.
//!
//! Expands contract terms into a monthly payment schedule, records collections against each
//! period, applies rent escalations, splits commissions, and derives delinquency and contract
//! lifecycle state. Everything outside that core (property catalog, CRM, messaging, documents)
//! talks to this crate through opaque identifiers and the operations on
//! [`ledger::RentalLedgerService`].

pub mod config;
pub mod error;
pub mod ledger;
pub mod telemetry;
