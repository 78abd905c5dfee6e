use super::common::*;
use crate::ledger::router::ledger_router;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::ServiceExt;

fn router() -> (Router, std::sync::Arc<MemoryService>) {
    let (service, _, _) = build_service();
    (ledger_router(service.clone()), service)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request builds")
}

#[tokio::test]
async fn create_contract_returns_the_view() {
    let (app, _) = router();
    let body = serde_json::to_value(terms()).expect("terms serialize");

    let response = app
        .oneshot(json_request("POST", "/api/v1/contracts", body))
        .await
        .expect("router responds");
    let (status, payload) = json_body(response).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(payload["contract"]["status"], "active");
    assert_eq!(payload["contract"]["currency"], "PYG");
    assert_eq!(payload["summary"]["periods_total"], 12);
    assert_eq!(decimal(&payload["summary"]["expected"]), dec!(6000000));
}

#[tokio::test]
async fn invalid_terms_name_the_field() {
    let (app, _) = router();
    let mut body = serde_json::to_value(terms()).expect("terms serialize");
    body["duration_months"] = json!(0);

    let response = app
        .oneshot(json_request("POST", "/api/v1/contracts", body))
        .await
        .expect("router responds");
    let (status, payload) = json_body(response).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(payload["kind"], "invalid_contract");
    assert_eq!(payload["field"], "duration_months");
    assert_eq!(payload["retryable"], false);
}

#[tokio::test]
async fn payment_settles_once_and_then_conflicts() {
    let (app, service) = router();
    let (_, periods) = seeded(&service);
    let uri = format!("/api/v1/periods/{}/payments", periods[0]);

    let first = app
        .clone()
        .oneshot(json_request("POST", &uri, json!({ "amount": "500000" })))
        .await
        .expect("router responds");
    let (status, payload) = json_body(first).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["status"], "collected");
    assert_eq!(decimal(&payload["agency_commission_amount"]), dec!(25000));
    assert_eq!(decimal(&payload["agent_commission_amount"]), dec!(5000));
    assert_eq!(decimal(&payload["owner_net_amount"]), dec!(475000));

    let second = app
        .oneshot(json_request("POST", &uri, json!({ "amount": "500000" })))
        .await
        .expect("router responds");
    let (status, payload) = json_body(second).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(payload["kind"], "already_settled");
    assert_eq!(payload["period_id"], periods[0].to_string());
}

#[tokio::test]
async fn reopen_without_reason_is_rejected() {
    let (app, service) = router();
    let (_, periods) = seeded(&service);
    service
        .record_payment(periods[0], dec!(500000), None)
        .expect("collection");

    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/periods/{}/reopen", periods[0]),
            json!({ "reason": "   " }),
        ))
        .await
        .expect("router responds");
    let (status, payload) = json_body(response).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(payload["kind"], "reason_required");
}

#[tokio::test]
async fn schedule_reports_overdue_as_of_the_query_date() {
    let (app, service) = router();
    let (contract_id, _) = seeded(&service);

    let response = app
        .oneshot(get(&format!(
            "/api/v1/contracts/{contract_id}/schedule?as_of=2025-02-11"
        )))
        .await
        .expect("router responds");
    let (status, payload) = json_body(response).await;

    assert_eq!(status, StatusCode::OK);
    let periods = payload.as_array().expect("period list");
    assert_eq!(periods.len(), 12);
    assert_eq!(periods[0]["period"], "2025-01");
    assert_eq!(periods[0]["due_date"], "2025-01-10");
    assert_eq!(periods[1]["status"], "overdue");
    assert_eq!(periods[2]["status"], "pending");
}

#[tokio::test]
async fn adjustment_out_of_order_conflicts() {
    let (app, service) = router();
    let (contract_id, _) = seeded(&service);
    let uri = format!("/api/v1/contracts/{contract_id}/adjustments");
    let request = json!({
        "effective_period_index": 6,
        "new_base_amount": "550000",
        "source": "index-value",
    });

    let first = app
        .clone()
        .oneshot(json_request("POST", &uri, request.clone()))
        .await
        .expect("router responds");
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = app
        .oneshot(json_request("POST", &uri, request))
        .await
        .expect("router responds");
    let (status, payload) = json_body(second).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(payload["kind"], "adjustment_out_of_order");
    assert_eq!(payload["effective_period_index"], 6);
}

#[tokio::test]
async fn snapshot_rejects_malformed_months() {
    let (app, _) = router();

    let response = app
        .oneshot(get("/api/v1/snapshots/2025-13"))
        .await
        .expect("router responds");
    let (status, payload) = json_body(response).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(payload["kind"], "invalid_month");
}

#[tokio::test]
async fn snapshot_and_delinquency_report_share_the_as_of_date() {
    let (app, service) = router();
    let (_, periods) = seeded(&service);
    service
        .record_payment(periods[0], dec!(500000), None)
        .expect("collection");

    let snapshot = app
        .clone()
        .oneshot(get("/api/v1/snapshots/2025-02?as_of=2025-02-20"))
        .await
        .expect("router responds");
    let (status, payload) = json_body(snapshot).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&payload["expected"]), dec!(500000));
    assert_eq!(decimal(&payload["delayed"]), dec!(500000));
    assert_eq!(decimal(&payload["pending"]), dec!(0));

    let report = app
        .oneshot(get("/api/v1/delinquency?as_of=2025-02-20"))
        .await
        .expect("router responds");
    let (status, payload) = json_body(report).await;
    assert_eq!(status, StatusCode::OK);
    let overdue = payload.as_array().expect("overdue list");
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0]["period_id"], periods[1].to_string());
    assert_eq!(overdue[0]["days_overdue"], 10);
}

#[tokio::test]
async fn unknown_contract_is_not_found() {
    let (app, _) = router();
    let missing = crate::ledger::ContractId::generate();

    let response = app
        .oneshot(get(&format!("/api/v1/contracts/{missing}")))
        .await
        .expect("router responds");
    let (status, payload) = json_body(response).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(payload["kind"], "contract_not_found");
    assert_eq!(payload["contract_id"], missing.to_string());
}

#[tokio::test]
async fn non_numeric_payment_amount_is_an_invalid_amount() {
    let (app, service) = router();
    let (_, periods) = seeded(&service);
    let uri = format!("/api/v1/periods/{}/payments", periods[0]);

    let response = app
        .clone()
        .oneshot(json_request("POST", &uri, json!({ "amount": "abc" })))
        .await
        .expect("router responds");
    let (status, payload) = json_body(response).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(payload["kind"], "invalid_amount");
    assert_eq!(payload["field"], "amount");
    assert_eq!(payload["retryable"], false);

    let oversized = app
        .oneshot(json_request(
            "POST",
            &uri,
            json!({ "amount": "79228162514264337593543950335" }),
        ))
        .await
        .expect("router responds");
    let (status, payload) = json_body(oversized).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(payload["kind"], "invalid_amount");
    assert_eq!(payload["field"], "amount");
}

#[tokio::test]
async fn undecodable_terms_name_the_field() {
    let (app, _) = router();
    let mut body = serde_json::to_value(terms()).expect("terms serialize");
    body["base_amount"] = json!("five hundred thousand");

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/v1/contracts", body))
        .await
        .expect("router responds");
    let (status, payload) = json_body(response).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(payload["kind"], "invalid_contract");
    assert_eq!(payload["field"], "base_amount");

    let mut body = serde_json::to_value(terms()).expect("terms serialize");
    if let Value::Object(fields) = &mut body {
        fields.remove("currency");
    }
    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/v1/contracts", body))
        .await
        .expect("router responds");
    let (status, payload) = json_body(response).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(payload["field"], "currency");

    let garbled = Request::builder()
        .method("POST")
        .uri("/api/v1/contracts")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .expect("request builds");
    let (status, payload) = json_body(app.oneshot(garbled).await.expect("router responds")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(payload["kind"], "invalid_contract");
    assert_eq!(payload["field"], "body");
}
