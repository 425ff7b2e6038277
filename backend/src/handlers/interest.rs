use std::collections::HashMap;

use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};

use super::require_address;
use crate::app::AppState;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::interest::{self, AutoSettleStatus, LoanRate, ObligationsView, Settlement};
use crate::response::{ApiResponse, ApiResult};
use crate::validation::present;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/loan-rates", get(loan_rates))
        .route("/user-obligations/:address", get(user_obligations))
        .route("/auto-settle", post(auto_settle))
        .route("/auto-settle-status/:address", get(auto_settle_status))
}

async fn loan_rates() -> ApiResult<HashMap<&'static str, LoanRate>> {
    Ok(ApiResponse::ok(interest::loan_rates()))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UserObligationsResponse {
    address: String,
    obligations: ObligationsView,
    can_auto_repay: bool,
}

async fn user_obligations(
    State(state): State<AppState>,
    ApiPath(address): ApiPath<String>,
) -> ApiResult<UserObligationsResponse> {
    let obligations = state.interest.obligations(&address).await;
    Ok(ApiResponse::ok(UserObligationsResponse {
        can_auto_repay: obligations.can_auto_settle(),
        obligations: obligations.view(),
        address,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoSettleBody {
    user_address: Option<String>,
    loan_id: Option<String>,
}

async fn auto_settle(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<AutoSettleBody>,
) -> ApiResult<Settlement> {
    let (Some(address), Some(loan_id)) = (present(body.user_address), present(body.loan_id)) else {
        return Err(ApiError::missing_parameters(&["userAddress", "loanId"]));
    };
    require_address(&address)?;

    let settlement = state.interest.auto_settle(&address, &loan_id).await?;
    Ok(ApiResponse::ok_with_message(
        "Interest automatically settled using LST earnings",
        settlement,
    ))
}

async fn auto_settle_status(
    State(state): State<AppState>,
    ApiPath(address): ApiPath<String>,
) -> ApiResult<AutoSettleStatus> {
    Ok(ApiResponse::ok(state.interest.status(&address).await))
}
