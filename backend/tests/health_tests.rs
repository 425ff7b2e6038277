mod helpers;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use tower::ServiceExt; // for `oneshot`

#[tokio::test]
async fn health_returns_200_even_when_upstream_is_down() {
    let test_context = helpers::TestContext::new().await;
    // No mocks registered: every 1inch call would fail.

    let response = test_context
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("request to /health failed");

    assert_eq!(response.status(), StatusCode::OK);

    let (_, body) = test_context.get("/health").await;
    assert_eq!(body["status"], "OK");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let test_context = helpers::TestContext::new().await;

    let response = test_context
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "abc-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("request to /health failed");

    assert_eq!(response.headers()["x-request-id"], "abc-123");
}

#[tokio::test]
async fn unknown_route_returns_404_envelope() {
    let test_context = helpers::TestContext::new().await;

    let (status, body) = test_context.get("/api/v1/does-not-exist").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Route not found");
}

#[tokio::test]
async fn api_root_lists_route_groups() {
    let test_context = helpers::TestContext::new().await;

    let (status, body) = test_context.get("/api/v1").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["endpoints"]["lending"], "/lending");
    assert_eq!(body["endpoints"]["1inch"], "/1inch");
}
