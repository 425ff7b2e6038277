use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
}

/// Liveness only. Never calls upstream services.
pub async fn health() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "OK",
        timestamp: Utc::now(),
    })
}
