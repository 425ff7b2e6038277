pub mod analytics;
pub mod health;
pub mod interest;
pub mod lending;
pub mod lst;
pub mod oneinch;
pub mod prime;
pub mod scheduler;
pub mod users;

use axum::{http::StatusCode, routing::get, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::validation::is_evm_address;

const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 100;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(api_info))
        .nest("/lending", lending::routes())
        .nest("/1inch", oneinch::routes())
        .nest("/prime", prime::routes())
        .nest("/lst", lst::routes())
        .nest("/interest", interest::routes())
        .nest("/scheduler", scheduler::routes())
        .nest("/analytics", analytics::routes())
        .nest("/users", users::routes())
}

async fn api_info() -> Json<Value> {
    Json(json!({
        "message": "LendLink API v1",
        "endpoints": {
            "lending": "/lending",
            "1inch": "/1inch",
            "prime": "/prime",
            "lst": "/lst",
            "interest": "/interest",
            "scheduler": "/scheduler",
            "analytics": "/analytics",
            "users": "/users",
        },
    }))
}

pub async fn not_found() -> (StatusCode, Json<ApiResponse<()>>) {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::failure("Route not found", None)),
    )
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

impl LimitQuery {
    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT)
    }
}

/// Returns the address if it is a well-formed EVM address.
pub fn require_address(address: &str) -> Result<&str, ApiError> {
    let address = address.trim();
    if is_evm_address(address) {
        Ok(address)
    } else {
        Err(ApiError::bad_request("Invalid address"))
    }
}
