use std::collections::BTreeMap;

use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;

use super::require_address;
use crate::app::AppState;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::lst::{self, AutoRepayment, LstProtocol, UserEarnings, YieldRate};
use crate::response::{ApiResponse, ApiResult};
use crate::validation::present;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/yield-rates", get(yield_rates))
        .route("/user-earnings/:address", get(user_earnings))
        .route("/auto-repay", post(auto_repay))
        .route("/protocols", get(protocols))
}

async fn yield_rates() -> ApiResult<BTreeMap<&'static str, YieldRate>> {
    Ok(ApiResponse::ok(lst::yield_rates(Utc::now())))
}

async fn user_earnings(
    State(state): State<AppState>,
    ApiPath(address): ApiPath<String>,
) -> ApiResult<UserEarnings> {
    Ok(ApiResponse::ok(state.lst.user_earnings(&address).await))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoRepayBody {
    user_address: Option<String>,
    loan_id: Option<String>,
    lst_token: Option<String>,
    amount: Option<Decimal>,
}

async fn auto_repay(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<AutoRepayBody>,
) -> ApiResult<AutoRepayment> {
    let (Some(address), Some(loan_id), Some(lst_token), Some(amount)) = (
        present(body.user_address),
        present(body.loan_id),
        present(body.lst_token),
        body.amount,
    ) else {
        return Err(ApiError::missing_parameters(&[
            "userAddress",
            "loanId",
            "lstToken",
            "amount",
        ]));
    };
    require_address(&address)?;

    let repayment = state
        .lst
        .auto_repay(&address, &loan_id, &lst_token, amount)
        .await?;
    Ok(ApiResponse::ok_with_message(
        "Loan repaid using LST earnings",
        repayment,
    ))
}

async fn protocols() -> ApiResult<Vec<LstProtocol>> {
    Ok(ApiResponse::ok(lst::protocols()))
}
