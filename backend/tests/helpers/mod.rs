#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use httpmock::MockServer;
use lendlink_backend::{
    config::{Config, Environment},
    create_app, AppState,
};
use serde_json::Value;
use tower::ServiceExt; // for `oneshot`

pub const DEMO_ADDRESS: &str = "0x1234567890123456789012345678901234567890";
pub const OTHER_ADDRESS: &str = "0x00000000000000000000000000000000000000aa";

/// A fully wired application whose 1inch client points at a local mock server.
pub struct TestContext {
    pub app: Router,
    pub state: AppState,
    pub upstream: MockServer,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_environment(Environment::Test).await
    }

    /// Same wiring, but failed responses carry the internal `error` detail.
    pub async fn development() -> Self {
        Self::with_environment(Environment::Development).await
    }

    async fn with_environment(environment: Environment) -> Self {
        let upstream = MockServer::start_async().await;
        let config = Config {
            environment,
            oneinch_base_url: upstream.base_url(),
            oneinch_timeout_secs: 2,
            scheduler_enabled: false,
            seed_demo_data: true,
            ..Config::default()
        };
        let state = AppState::new(config)
            .await
            .expect("Failed to build application state");

        Self {
            app: create_app(state.clone()),
            state,
            upstream,
        }
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, None).await
    }

    pub async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("request failed");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read response body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("response body is not JSON")
        };
        (status, json)
    }
}

/// Parses a decimal that the API serialized as a string.
pub fn decimal(value: &Value) -> rust_decimal::Decimal {
    value
        .as_str()
        .unwrap_or_else(|| panic!("expected a decimal string, got {value}"))
        .parse()
        .expect("invalid decimal")
}
