use crate::cli::ServeArgs;
use crate::infra::{AppState, LoggingAlertPublisher};
use crate::routes::with_ledger_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use rental_ledger::config::AppConfig;
use rental_ledger::error::AppError;
use rental_ledger::ledger::{InMemoryLedgerRepository, RentalLedgerService};
use rental_ledger::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let repository = Arc::new(InMemoryLedgerRepository::default());
    let alerts = Arc::new(LoggingAlertPublisher::default());
    let ledger_service = Arc::new(RentalLedgerService::new(
        repository,
        alerts,
        config.ledger,
    ));

    let app = with_ledger_routes(ledger_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        due_day = config.ledger.due_day,
        grace_days = config.ledger.grace_days,
        "rental ledger ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
