use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::domain::{AdjustmentSource, ContractId, ContractTerms, PeriodId, YearMonth};
use super::error::LedgerError;
use super::repository::{AlertPublisher, LedgerRepository, RepositoryError};
use super::service::RentalLedgerService;

type SharedService<R, A> = Arc<RentalLedgerService<R, A>>;

/// Router builder exposing the ledger operations over HTTP.
pub fn ledger_router<R, A>(service: SharedService<R, A>) -> Router
where
    R: LedgerRepository + 'static,
    A: AlertPublisher + 'static,
{
    Router::new()
        .route("/api/v1/contracts", post(create_contract_handler::<R, A>))
        .route(
            "/api/v1/contracts/:contract_id",
            get(contract_handler::<R, A>),
        )
        .route(
            "/api/v1/contracts/:contract_id/schedule",
            get(schedule_handler::<R, A>),
        )
        .route(
            "/api/v1/contracts/:contract_id/adjustments",
            post(adjustment_handler::<R, A>),
        )
        .route(
            "/api/v1/contracts/:contract_id/commission",
            put(commission_handler::<R, A>),
        )
        .route(
            "/api/v1/contracts/:contract_id/status",
            post(refresh_status_handler::<R, A>),
        )
        .route(
            "/api/v1/contracts/:contract_id/cancel",
            post(cancel_handler::<R, A>),
        )
        .route(
            "/api/v1/periods/:period_id/payments",
            post(record_payment_handler::<R, A>),
        )
        .route(
            "/api/v1/periods/:period_id/reopen",
            post(reopen_handler::<R, A>),
        )
        .route("/api/v1/snapshots/:month", get(snapshot_handler::<R, A>))
        .route("/api/v1/delinquency", get(delinquency_handler::<R, A>))
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub struct AsOfQuery {
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
}

impl AsOfQuery {
    fn resolve(&self) -> NaiveDate {
        self.as_of.unwrap_or_else(|| Utc::now().date_naive())
    }
}

#[derive(Debug, Deserialize)]
pub struct RecordPaymentRequest {
    pub amount: Decimal,
    #[serde(default)]
    pub collected_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct ReopenRequest {
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct AdjustmentRequest {
    pub effective_period_index: u32,
    pub new_base_amount: Decimal,
    pub source: AdjustmentSource,
}

#[derive(Debug, Deserialize)]
pub struct CommissionRevisionRequest {
    pub agency_commission_percentage: Decimal,
    pub agent_commission_percentage: Decimal,
}

/// Map a ledger failure to a status code and a body naming the error kind and the offending
/// field, period, or contract.
pub fn error_response(error: &LedgerError) -> Response {
    let status = match error {
        LedgerError::InvalidContract { .. }
        | LedgerError::InvalidAmount { .. }
        | LedgerError::ReasonRequired { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        LedgerError::PeriodNotFound(_) | LedgerError::ContractNotFound(_) => StatusCode::NOT_FOUND,
        LedgerError::AlreadySettled { .. }
        | LedgerError::AdjustmentOutOfOrder { .. }
        | LedgerError::ConcurrentModification { .. }
        | LedgerError::ContractCancelled { .. } => StatusCode::CONFLICT,
        LedgerError::Repository(RepositoryError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
        LedgerError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let mut payload = json!({
        "error": error.to_string(),
        "kind": error.kind(),
        "retryable": error.retryable(),
    });
    if let Value::Object(fields) = &mut payload {
        match error {
            LedgerError::InvalidContract { field, .. } | LedgerError::InvalidAmount { field, .. } => {
                fields.insert("field".to_string(), json!(field));
            }
            LedgerError::AlreadySettled { period_id }
            | LedgerError::ReasonRequired { period_id }
            | LedgerError::PeriodNotFound(period_id) => {
                fields.insert("period_id".to_string(), json!(period_id));
            }
            LedgerError::AdjustmentOutOfOrder {
                contract_id,
                effective_period_index,
                ..
            } => {
                fields.insert("contract_id".to_string(), json!(contract_id));
                fields.insert(
                    "effective_period_index".to_string(),
                    json!(effective_period_index),
                );
            }
            LedgerError::ContractNotFound(contract_id)
            | LedgerError::ConcurrentModification { contract_id }
            | LedgerError::ContractCancelled { contract_id } => {
                fields.insert("contract_id".to_string(), json!(contract_id));
            }
            LedgerError::Repository(_) => {}
        }
    }

    (status, Json(payload)).into_response()
}

const CONTRACT_FIELDS: &[&str] = &[
    "property_ref",
    "owner_ref",
    "tenant_ref",
    "agent_ref",
    "start_date",
    "duration_months",
    "base_amount",
    "currency",
    "adjustment_type",
    "adjustment_frequency",
    "agency_commission_percentage",
    "agent_commission_percentage",
];

/// A body axum could not decode, reported like any other validation failure. The offending
/// field is read off the decoder's `path: message` text; undecodable bodies name `body`.
fn rejected(
    rejection: JsonRejection,
    fields: &[&'static str],
    invalid: fn(&'static str, String) -> LedgerError,
) -> Response {
    let reason = rejection.body_text();
    let field = fields
        .iter()
        .copied()
        .find(|field| {
            reason.contains(&format!(": {field}: ")) || reason.contains(&format!("`{field}`"))
        })
        .unwrap_or("body");
    error_response(&invalid(field, reason))
}

fn invalid_contract(field: &'static str, reason: String) -> LedgerError {
    LedgerError::InvalidContract { field, reason }
}

fn invalid_amount(field: &'static str, reason: String) -> LedgerError {
    LedgerError::InvalidAmount { field, reason }
}

fn respond<T: serde::Serialize>(status: StatusCode, result: Result<T, LedgerError>) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(error) => error_response(&error),
    }
}

pub(crate) async fn create_contract_handler<R, A>(
    State(service): State<SharedService<R, A>>,
    payload: Result<Json<ContractTerms>, JsonRejection>,
) -> Response
where
    R: LedgerRepository + 'static,
    A: AlertPublisher + 'static,
{
    let Json(terms) = match payload {
        Ok(body) => body,
        Err(rejection) => return rejected(rejection, CONTRACT_FIELDS, invalid_contract),
    };
    let result = service
        .create_contract(terms)
        .and_then(|contract| service.contract(contract.id));
    respond(StatusCode::CREATED, result)
}

pub(crate) async fn contract_handler<R, A>(
    State(service): State<SharedService<R, A>>,
    Path(contract_id): Path<Uuid>,
) -> Response
where
    R: LedgerRepository + 'static,
    A: AlertPublisher + 'static,
{
    respond(StatusCode::OK, service.contract(ContractId(contract_id)))
}

pub(crate) async fn schedule_handler<R, A>(
    State(service): State<SharedService<R, A>>,
    Path(contract_id): Path<Uuid>,
    Query(query): Query<AsOfQuery>,
) -> Response
where
    R: LedgerRepository + 'static,
    A: AlertPublisher + 'static,
{
    respond(
        StatusCode::OK,
        service.schedule_as_of(ContractId(contract_id), query.resolve()),
    )
}

pub(crate) async fn adjustment_handler<R, A>(
    State(service): State<SharedService<R, A>>,
    Path(contract_id): Path<Uuid>,
    payload: Result<Json<AdjustmentRequest>, JsonRejection>,
) -> Response
where
    R: LedgerRepository + 'static,
    A: AlertPublisher + 'static,
{
    let Json(request) = match payload {
        Ok(body) => body,
        Err(rejection) => {
            let fields = ["new_base_amount", "effective_period_index", "source"];
            return rejected(rejection, &fields, invalid_amount);
        }
    };
    let result = service.apply_adjustment(
        ContractId(contract_id),
        request.effective_period_index,
        request.new_base_amount,
        request.source,
    );
    respond(StatusCode::CREATED, result)
}

pub(crate) async fn commission_handler<R, A>(
    State(service): State<SharedService<R, A>>,
    Path(contract_id): Path<Uuid>,
    payload: Result<Json<CommissionRevisionRequest>, JsonRejection>,
) -> Response
where
    R: LedgerRepository + 'static,
    A: AlertPublisher + 'static,
{
    let Json(request) = match payload {
        Ok(body) => body,
        Err(rejection) => return rejected(rejection, CONTRACT_FIELDS, invalid_contract),
    };
    let result = service.revise_commission(
        ContractId(contract_id),
        request.agency_commission_percentage,
        request.agent_commission_percentage,
    );
    respond(StatusCode::OK, result)
}

pub(crate) async fn refresh_status_handler<R, A>(
    State(service): State<SharedService<R, A>>,
    Path(contract_id): Path<Uuid>,
    Query(query): Query<AsOfQuery>,
) -> Response
where
    R: LedgerRepository + 'static,
    A: AlertPublisher + 'static,
{
    respond(
        StatusCode::OK,
        service.refresh_status(ContractId(contract_id), query.resolve()),
    )
}

pub(crate) async fn cancel_handler<R, A>(
    State(service): State<SharedService<R, A>>,
    Path(contract_id): Path<Uuid>,
) -> Response
where
    R: LedgerRepository + 'static,
    A: AlertPublisher + 'static,
{
    respond(StatusCode::OK, service.cancel_contract(ContractId(contract_id)))
}

pub(crate) async fn record_payment_handler<R, A>(
    State(service): State<SharedService<R, A>>,
    Path(period_id): Path<Uuid>,
    payload: Result<Json<RecordPaymentRequest>, JsonRejection>,
) -> Response
where
    R: LedgerRepository + 'static,
    A: AlertPublisher + 'static,
{
    let Json(request) = match payload {
        Ok(body) => body,
        Err(rejection) => return rejected(rejection, &["amount", "collected_at"], invalid_amount),
    };
    let result = service.record_payment(PeriodId(period_id), request.amount, request.collected_at);
    respond(StatusCode::OK, result)
}

pub(crate) async fn reopen_handler<R, A>(
    State(service): State<SharedService<R, A>>,
    Path(period_id): Path<Uuid>,
    payload: Result<Json<ReopenRequest>, JsonRejection>,
) -> Response
where
    R: LedgerRepository + 'static,
    A: AlertPublisher + 'static,
{
    // an unreadable body carries no usable reason
    let reason = payload.map(|Json(request)| request.reason).unwrap_or_default();
    respond(
        StatusCode::OK,
        service.reopen_payment(PeriodId(period_id), &reason),
    )
}

pub(crate) async fn snapshot_handler<R, A>(
    State(service): State<SharedService<R, A>>,
    Path(month): Path<String>,
    Query(query): Query<AsOfQuery>,
) -> Response
where
    R: LedgerRepository + 'static,
    A: AlertPublisher + 'static,
{
    match month.parse::<YearMonth>() {
        Ok(month) => respond(
            StatusCode::OK,
            service.monthly_snapshot(month, query.resolve()),
        ),
        Err(error) => {
            let payload = json!({
                "error": error.to_string(),
                "kind": "invalid_month",
                "field": "month",
            });
            (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
        }
    }
}

pub(crate) async fn delinquency_handler<R, A>(
    State(service): State<SharedService<R, A>>,
    Query(query): Query<AsOfQuery>,
) -> Response
where
    R: LedgerRepository + 'static,
    A: AlertPublisher + 'static,
{
    respond(StatusCode::OK, service.overdue_periods(query.resolve()))
}
