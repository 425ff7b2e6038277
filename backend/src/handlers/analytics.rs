use axum::{extract::State, routing::get, Router};
use chrono::Utc;

use super::LimitQuery;
use crate::analytics::{self, Overview, UserStats};
use crate::app::AppState;
use crate::extract::ApiQuery;
use crate::ledger::{LedgerEntry, SeriesMetric, SeriesPoint};
use crate::response::{ApiResponse, ApiResult};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/overview", get(overview))
        .route("/tvl", get(tvl))
        .route("/debt", get(debt))
        .route("/users", get(users))
        .route("/activity", get(activity))
}

async fn overview(State(state): State<AppState>) -> ApiResult<Overview> {
    Ok(ApiResponse::ok(analytics::overview(&state.ledger).await?))
}

async fn tvl(State(state): State<AppState>) -> ApiResult<Vec<SeriesPoint>> {
    let series = state
        .ledger
        .daily_series(SeriesMetric::TotalValueLocked)
        .await?;
    Ok(ApiResponse::ok(series))
}

async fn debt(State(state): State<AppState>) -> ApiResult<Vec<SeriesPoint>> {
    let series = state.ledger.daily_series(SeriesMetric::TotalDebt).await?;
    Ok(ApiResponse::ok(series))
}

async fn users(State(state): State<AppState>) -> ApiResult<UserStats> {
    Ok(ApiResponse::ok(
        analytics::user_stats(&state.ledger, Utc::now()).await?,
    ))
}

async fn activity(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<LimitQuery>,
) -> ApiResult<Vec<LedgerEntry>> {
    let entries = state.ledger.history(None, query.limit()).await?;
    Ok(ApiResponse::ok(entries))
}
