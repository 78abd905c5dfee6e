use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use rental_ledger::ledger::{AlertError, AlertPublisher, LedgerAlert};
use rust_decimal::Decimal;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Writes every ledger alert to the log and keeps the most recent ones for inspection.
#[derive(Default, Clone)]
pub(crate) struct LoggingAlertPublisher {
    events: Arc<Mutex<Vec<LedgerAlert>>>,
}

const RETAINED_ALERTS: usize = 256;

impl AlertPublisher for LoggingAlertPublisher {
    fn publish(&self, alert: LedgerAlert) -> Result<(), AlertError> {
        info!(
            kind = ?alert.kind,
            contract_id = %alert.contract_id,
            tenant_ref = %alert.tenant_ref,
            overdue_periods = alert.overdue_periods.len(),
            details = ?alert.details,
            "ledger alert"
        );

        let mut guard = self
            .events
            .lock()
            .map_err(|_| AlertError::Transport("alert buffer poisoned".to_string()))?;
        if guard.len() == RETAINED_ALERTS {
            guard.remove(0);
        }
        guard.push(alert);
        Ok(())
    }
}

impl LoggingAlertPublisher {
    pub(crate) fn events(&self) -> Vec<LedgerAlert> {
        self.events
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn parse_amount(raw: &str) -> Result<Decimal, String> {
    raw.trim()
        .parse::<Decimal>()
        .map_err(|err| format!("failed to parse '{raw}' as a decimal amount ({err})"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rental_ledger::ledger::{AlertKind, ContractId};
    use std::collections::BTreeMap;

    #[test]
    fn parse_helpers_reject_garbage() {
        assert_eq!(
            parse_date(" 2025-03-10 "),
            Ok(NaiveDate::from_ymd_opt(2025, 3, 10).expect("valid date"))
        );
        assert!(parse_date("10/03/2025").is_err());
        assert_eq!(parse_amount("1250.50"), Ok(Decimal::new(125050, 2)));
        assert!(parse_amount("twelve").is_err());
    }

    #[test]
    fn publisher_keeps_a_bounded_buffer() {
        let publisher = LoggingAlertPublisher::default();
        let contract_id = ContractId::generate();
        for _ in 0..RETAINED_ALERTS + 3 {
            publisher
                .publish(LedgerAlert {
                    kind: AlertKind::ContractDelinquent,
                    contract_id,
                    tenant_ref: "tenant-acosta".to_string(),
                    overdue_periods: Vec::new(),
                    details: BTreeMap::new(),
                })
                .expect("publish succeeds");
        }

        assert_eq!(publisher.events().len(), RETAINED_ALERTS);
    }
}
