use axum::{extract::State, routing::get, Router};
use serde::Deserialize;

use super::LimitQuery;
use crate::app::AppState;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::ledger::{LedgerEntry, PositionSummary};
use crate::response::{ApiResponse, ApiResult};
use crate::users::{Preferences, UserProfile};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/top", get(top))
        .route("/:address", get(profile).post(update_profile))
        .route("/:address/positions", get(positions))
        .route("/:address/transactions", get(transactions))
}

async fn top(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<LimitQuery>,
) -> ApiResult<Vec<UserProfile>> {
    Ok(ApiResponse::ok(state.users.top(query.limit()).await))
}

async fn profile(
    State(state): State<AppState>,
    ApiPath(address): ApiPath<String>,
) -> ApiResult<UserProfile> {
    Ok(ApiResponse::ok(state.users.profile(&address).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct ProfileUpdate {
    username: Option<String>,
    preferences: Option<Preferences>,
}

async fn update_profile(
    State(state): State<AppState>,
    ApiPath(address): ApiPath<String>,
    ApiJson(body): ApiJson<ProfileUpdate>,
) -> ApiResult<UserProfile> {
    let username = body.username.map(|name| name.trim().to_string());
    let profile = state
        .users
        .update(&address, username, body.preferences)
        .await?;
    Ok(ApiResponse::ok_with_message(
        "User profile updated successfully",
        profile,
    ))
}

async fn positions(
    State(state): State<AppState>,
    ApiPath(address): ApiPath<String>,
) -> ApiResult<PositionSummary> {
    let position = state
        .ledger
        .position(&address)
        .await?
        .ok_or_else(|| ApiError::not_found("No positions found for user"))?;
    Ok(ApiResponse::ok(position.summary()))
}

async fn transactions(
    State(state): State<AppState>,
    ApiPath(address): ApiPath<String>,
    ApiQuery(query): ApiQuery<LimitQuery>,
) -> ApiResult<Vec<LedgerEntry>> {
    let entries = state
        .ledger
        .history(Some(&address), query.limit())
        .await?;
    Ok(ApiResponse::ok(entries))
}
