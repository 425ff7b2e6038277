use std::collections::BTreeMap;

use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::require_address;
use crate::app::AppState;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::oneinch::{ChainId, SwapQuoteOptions};
use crate::prime::{
    self, BridgeFee, BridgeTransfer, CrossChainLoan, LoanRequest, PrimeOverview, SupportedChain,
    SwapRecord, SwapRequest, SUPPORTED_CHAINS,
};
use crate::response::{ApiResponse, ApiResult};
use crate::validation::present;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/overview", get(overview))
        .route("/supported-tokens", get(supported_tokens))
        .route("/supported-chains", get(supported_chains))
        .route("/quote", get(quote))
        .route("/bridge-fee", get(bridge_fee))
        .route("/initiate-loan", post(initiate_loan))
        .route("/execute-cross-chain-swap", post(execute_cross_chain_swap))
        .route("/repay-loan", post(repay_loan))
        .route("/loan/:id", get(loan))
        .route("/user/:address/loans", get(user_loans))
        .route("/bridge/:id", get(bridge))
        .route("/swap/:id", get(swap))
}

async fn overview(State(state): State<AppState>) -> ApiResult<PrimeOverview> {
    Ok(ApiResponse::ok(state.prime.overview().await))
}

async fn supported_tokens() -> ApiResult<BTreeMap<String, Vec<&'static str>>> {
    Ok(ApiResponse::ok(prime::supported_tokens()))
}

async fn supported_chains() -> ApiResult<&'static [SupportedChain]> {
    Ok(ApiResponse::ok(&SUPPORTED_CHAINS[..]))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteQuery {
    src_token: Option<String>,
    dst_token: Option<String>,
    amount: Option<String>,
    #[serde(default)]
    chain_id: ChainId,
}

async fn quote(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<QuoteQuery>,
) -> ApiResult<Value> {
    let (Some(src), Some(dst), Some(amount)) = (
        present(query.src_token),
        present(query.dst_token),
        present(query.amount),
    ) else {
        return Err(ApiError::missing_parameters(&["srcToken", "dstToken", "amount"]));
    };
    let quote = state
        .oneinch
        .get_swap_quote(&src, &dst, &amount, query.chain_id, &SwapQuoteOptions::default())
        .await
        .map_err(|err| ApiError::upstream("Failed to get cross-chain quote", err))?;
    Ok(ApiResponse::ok(quote))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeFeeQuery {
    source_chain: Option<ChainId>,
    destination_chain: Option<ChainId>,
    token: Option<String>,
    amount: Option<Decimal>,
}

async fn bridge_fee(ApiQuery(query): ApiQuery<BridgeFeeQuery>) -> ApiResult<BridgeFee> {
    let (Some(source), Some(destination), Some(token), Some(amount)) = (
        query.source_chain,
        query.destination_chain,
        present(query.token),
        query.amount,
    ) else {
        return Err(ApiError::missing_parameters(&[
            "sourceChain",
            "destinationChain",
            "token",
            "amount",
        ]));
    };
    if amount.is_sign_negative() {
        return Err(ApiError::bad_request("Amount must be greater than zero"));
    }
    Ok(ApiResponse::ok(prime::bridge_fee(
        source,
        destination,
        &token,
        amount,
    )))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateLoanBody {
    user_address: Option<String>,
    source_chain: Option<ChainId>,
    destination_chain: Option<ChainId>,
    collateral_token: Option<String>,
    borrow_token: Option<String>,
    collateral_amount: Option<Decimal>,
    borrow_amount: Option<Decimal>,
}

impl InitiateLoanBody {
    fn into_request(self) -> Result<LoanRequest, ApiError> {
        let (
            Some(borrower),
            Some(source_chain),
            Some(destination_chain),
            Some(collateral_token),
            Some(borrow_token),
            Some(collateral_amount),
            Some(borrow_amount),
        ) = (
            present(self.user_address),
            self.source_chain,
            self.destination_chain,
            present(self.collateral_token),
            present(self.borrow_token),
            self.collateral_amount,
            self.borrow_amount,
        )
        else {
            return Err(ApiError::missing_parameters(&[
                "userAddress",
                "sourceChain",
                "destinationChain",
                "collateralToken",
                "borrowToken",
                "collateralAmount",
                "borrowAmount",
            ]));
        };
        require_address(&borrower)?;
        Ok(LoanRequest {
            borrower,
            source_chain,
            destination_chain,
            collateral_token,
            borrow_token,
            collateral_amount,
            borrow_amount,
        })
    }
}

async fn initiate_loan(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<InitiateLoanBody>,
) -> ApiResult<CrossChainLoan> {
    let loan = state.prime.initiate_loan(body.into_request()?).await?;
    Ok(ApiResponse::ok_with_message(
        "Cross-chain loan initiated successfully",
        loan,
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossChainSwapBody {
    loan_id: Option<String>,
    src_token: Option<String>,
    dst_token: Option<String>,
    amount: Option<Decimal>,
    src_chain_id: Option<ChainId>,
    dst_chain_id: Option<ChainId>,
    from: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SwapOutcome {
    loan: CrossChainLoan,
    swap: SwapRecord,
}

async fn execute_cross_chain_swap(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CrossChainSwapBody>,
) -> ApiResult<SwapOutcome> {
    let (Some(loan_id), Some(src_token), Some(dst_token), Some(amount)) = (
        present(body.loan_id),
        present(body.src_token),
        present(body.dst_token),
        body.amount,
    ) else {
        return Err(ApiError::missing_parameters(&[
            "loanId", "srcToken", "dstToken", "amount",
        ]));
    };
    let from = present(body.from);
    if let Some(from) = &from {
        require_address(from)?;
    }

    let (loan, swap) = state
        .prime
        .execute_cross_chain_swap(SwapRequest {
            loan_id,
            src_token,
            dst_token,
            amount,
            src_chain_id: body.src_chain_id,
            dst_chain_id: body.dst_chain_id,
            from,
        })
        .await?;
    Ok(ApiResponse::ok_with_message(
        "Cross-chain swap executed successfully",
        SwapOutcome { loan, swap },
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepayLoanBody {
    loan_id: Option<String>,
    repay_amount: Option<Decimal>,
}

async fn repay_loan(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RepayLoanBody>,
) -> ApiResult<CrossChainLoan> {
    let (Some(loan_id), Some(amount)) = (present(body.loan_id), body.repay_amount) else {
        return Err(ApiError::missing_parameters(&["loanId", "repayAmount"]));
    };
    let loan = state.prime.repay_loan(&loan_id, amount).await?;
    Ok(ApiResponse::ok_with_message(
        "Cross-chain loan repayment applied",
        loan,
    ))
}

async fn loan(
    State(state): State<AppState>,
    ApiPath(loan_id): ApiPath<String>,
) -> ApiResult<CrossChainLoan> {
    Ok(ApiResponse::ok(state.prime.loan(&loan_id).await?))
}

async fn user_loans(
    State(state): State<AppState>,
    ApiPath(address): ApiPath<String>,
) -> ApiResult<Vec<CrossChainLoan>> {
    Ok(ApiResponse::ok(state.prime.user_loans(&address).await))
}

async fn bridge(
    State(state): State<AppState>,
    ApiPath(bridge_id): ApiPath<String>,
) -> ApiResult<BridgeTransfer> {
    Ok(ApiResponse::ok(state.prime.bridge(&bridge_id).await?))
}

async fn swap(
    State(state): State<AppState>,
    ApiPath(swap_id): ApiPath<String>,
) -> ApiResult<SwapRecord> {
    Ok(ApiResponse::ok(state.prime.swap(&swap_id).await?))
}
