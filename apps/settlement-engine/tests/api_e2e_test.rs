//! E2E tests through the HTTP API: publish → take → exercise.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{Harness, amt, usdc, weth};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use serde_json::{Value, json};
use settlement_engine::infrastructure::http::CALLER_HEADER;
use settlement_engine::{AppState, ExerciseRequest, TakeReceipt, create_router};
use tower::ServiceExt;

fn app(h: &Harness) -> Router {
    create_router(AppState {
        lifecycle: h.engine.clone(),
        version: "test".to_string(),
    })
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    caller: Option<&str>,
    body: Option<Vec<u8>>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(caller) = caller {
        request = request.header(CALLER_HEADER, caller);
    }
    let request = match body {
        Some(bytes) => request
            .header("content-type", "application/json")
            .body(Body::from(bytes))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn decimal(value: &Value) -> Decimal {
    value.as_str().unwrap().parse().unwrap()
}

fn json_body<T: Serialize>(value: &T) -> Option<Vec<u8>> {
    Some(serde_json::to_vec(value).unwrap())
}

#[tokio::test]
async fn publish_take_and_exercise_over_http() {
    let h = Harness::new(dec!(3500));
    let app = app(&h);
    let lp = h.lp_id().to_string();
    let taker = h.taker_id().to_string();

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/accounts/deposit",
        Some(&lp),
        json_body(&json!({"asset": "WETH", "amount": "1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/accounts/deposit",
        Some(&taker),
        json_body(&json!({"asset": "USDC", "amount": "1000"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&body["balance"]), dec!(1000));

    let (status, body) = send(&app, "POST", "/api/v1/commitments", None, json_body(&h.call_offer())).await;
    assert_eq!(status, StatusCode::CREATED);
    let hash = body["hash"].as_str().unwrap().to_string();

    let (status, body) = send(&app, "GET", "/api/v1/commitments", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/commitments/{hash}/take"),
        Some(&taker),
        json_body(&json!({"duration_days": 7})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let receipt: TakeReceipt = serde_json::from_value(body).unwrap();
    assert_eq!(receipt.premium, amt(dec!(70)));

    let (status, body) = send(&app, "GET", "/api/v1/collateralization/WETH", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&body["total_locked"]), dec!(0.5));

    h.router.set_price("WETH", dec!(4000));
    let exercise = ExerciseRequest {
        settlement: h.params(dec!(2000)),
        max_price_movement_bps: None,
    };
    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/options/{}/exercise", receipt.option_id),
        Some(&taker),
        json_body(&exercise),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "EXERCISED");

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/v1/accounts/{taker}/balances/USDC"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&body["balance"]), dec!(1180));

    let (_, body) = send(&app, "GET", "/api/v1/admin/revenue/USDC", None, None).await;
    assert_eq!(decimal(&body["balance"]), dec!(0.2));
    assert_eq!(h.engine.total_locked(&weth()), amt(dec!(0)));
    assert_eq!(h.balance(&h.lp_id(), &usdc()), amt(dec!(1819.8)));
}

#[tokio::test]
async fn second_exercise_conflicts() {
    let h = Harness::new(dec!(3500));
    h.fund();
    let app = app(&h);
    let taker = h.taker_id().to_string();

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/options",
        Some(&taker),
        json_body(&json!({"signed": h.call_offer(), "duration_days": 2})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let option_id = body["option_id"].as_u64().unwrap();

    h.router.set_price("WETH", dec!(4000));
    let exercise = ExerciseRequest {
        settlement: h.params(dec!(2000)),
        max_price_movement_bps: None,
    };
    let uri = format!("/api/v1/options/{option_id}/exercise");
    let (status, _) = send(&app, "POST", &uri, Some(&taker), json_body(&exercise)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "POST", &uri, Some(&taker), json_body(&exercise)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "NOT_EXERCISABLE");
}

#[tokio::test]
async fn replayed_take_rejected_with_conflict() {
    let h = Harness::new(dec!(3000));
    h.fund();
    let app = app(&h);
    let taker = h.taker_id().to_string();
    let body = json!({"signed": h.call_offer(), "duration_days": 1});

    let (status, _) = send(&app, "POST", "/api/v1/options", Some(&taker), json_body(&body)).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, "POST", "/api/v1/options", Some(&taker), json_body(&body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "NONCE_MISMATCH");
}

#[tokio::test]
async fn paused_engine_returns_service_unavailable() {
    let h = Harness::new(dec!(3000));
    h.fund();
    let app = app(&h);

    let (status, _) = send(&app, "POST", "/api/v1/admin/pause", Some("admin"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/options",
        Some(&h.taker_id().to_string()),
        json_body(&json!({"signed": h.call_offer(), "duration_days": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "PAUSED");

    let (_, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(body["paused"], true);
}
