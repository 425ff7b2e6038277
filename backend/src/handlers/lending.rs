use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::require_address;
use crate::app::AppState;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::ledger::{
    BorrowAsset, CollateralAsset, EntryKind, Position, PositionSummary, ProtocolStats, Receipt,
};
use crate::response::{ApiResponse, ApiResult};
use crate::validation::{address_key, present};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/overview", get(overview))
        .route("/user/:address", get(user_position))
        .route("/deposit", post(deposit))
        .route("/borrow", post(borrow))
        .route("/repay", post(repay))
        .route("/supported-tokens", get(supported_tokens))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LendingOverview {
    #[serde(flatten)]
    stats: ProtocolStats,
    supported_tokens: Vec<String>,
}

async fn overview(State(state): State<AppState>) -> ApiResult<LendingOverview> {
    let stats = state.ledger.stats().await?;
    Ok(ApiResponse::ok(LendingOverview {
        stats,
        supported_tokens: state.ledger.registry().symbols(),
    }))
}

/// A user with no activity yet gets an empty position rather than a 404.
async fn user_position(
    State(state): State<AppState>,
    ApiPath(address): ApiPath<String>,
) -> ApiResult<PositionSummary> {
    let position = state
        .ledger
        .position(&address)
        .await?
        .unwrap_or_else(|| Position::new(address_key(&address), Utc::now()));
    Ok(ApiResponse::ok(position.summary()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerRequest {
    user_address: Option<String>,
    token: Option<String>,
    amount: Option<Decimal>,
}

impl LedgerRequest {
    fn into_parts(self) -> Result<(String, String, Decimal), ApiError> {
        match (present(self.user_address), present(self.token), self.amount) {
            (Some(address), Some(token), Some(amount)) => {
                require_address(&address)?;
                Ok((address, token, amount))
            }
            _ => Err(ApiError::missing_parameters(&["userAddress", "token", "amount"])),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LedgerReceipt {
    transaction_id: Uuid,
    #[serde(rename = "type")]
    kind: EntryKind,
    user_address: String,
    token: String,
    amount: Decimal,
    value_usd: Decimal,
    position: PositionSummary,
    timestamp: DateTime<Utc>,
}

impl From<Receipt> for LedgerReceipt {
    fn from(receipt: Receipt) -> Self {
        let Receipt { entry, position } = receipt;
        Self {
            transaction_id: entry.id,
            kind: entry.kind,
            user_address: entry.address,
            token: entry.token,
            amount: entry.amount,
            value_usd: entry.value_usd,
            position: position.summary(),
            timestamp: entry.timestamp,
        }
    }
}

async fn deposit(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LedgerRequest>,
) -> ApiResult<LedgerReceipt> {
    let (address, token, amount) = body.into_parts()?;
    let receipt = state.ledger.deposit(&address, &token, amount).await?;
    Ok(ApiResponse::ok_with_message("Deposit successful", receipt.into()))
}

async fn borrow(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LedgerRequest>,
) -> ApiResult<LedgerReceipt> {
    let (address, token, amount) = body.into_parts()?;
    let receipt = state.ledger.borrow(&address, &token, amount).await?;
    Ok(ApiResponse::ok_with_message("Borrow successful", receipt.into()))
}

async fn repay(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LedgerRequest>,
) -> ApiResult<LedgerReceipt> {
    let (address, token, amount) = body.into_parts()?;
    let receipt = state.ledger.repay(&address, &token, amount).await?;
    Ok(ApiResponse::ok_with_message("Repayment successful", receipt.into()))
}

#[derive(Debug, Serialize)]
struct SupportedTokens {
    collateral: Vec<CollateralAsset>,
    borrow: Vec<BorrowAsset>,
}

async fn supported_tokens(State(state): State<AppState>) -> ApiResult<SupportedTokens> {
    let registry = state.ledger.registry();
    Ok(ApiResponse::ok(SupportedTokens {
        collateral: registry.collateral_assets().to_vec(),
        borrow: registry.borrow_assets().to_vec(),
    }))
}
