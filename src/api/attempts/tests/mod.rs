mod faculty_flows;

use axum::http::Method;
use axum::Router;
use serde_json::json;
use tower::ServiceExt;

use crate::test_support;

/// Starts an attempt and returns (status, body).
async fn start_attempt(
    app: Router,
    token: &str,
    exam_id: &str,
) -> (axum::http::StatusCode, serde_json::Value) {
    let response = app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/attempts/start",
            Some(token),
            Some(json!({ "exam_id": exam_id })),
        ))
        .await
        .expect("start attempt");

    let status = response.status();
    let body = test_support::read_json(response).await;
    (status, body)
}

async fn submit_attempt(
    app: Router,
    token: &str,
    attempt_id: &str,
) -> (axum::http::StatusCode, serde_json::Value) {
    let response = app
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/attempts/{attempt_id}/submit"),
            Some(token),
            None,
        ))
        .await
        .expect("submit attempt");

    let status = response.status();
    let body = test_support::read_json(response).await;
    (status, body)
}
