//! Pass-through routes for the 1inch API. Upstream JSON is returned as-is;
//! every upstream failure becomes a 500 with a "Failed to ..." message.

use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::oneinch::{ChainId, OneInchError, SwapQuoteOptions};
use crate::response::{ApiResponse, ApiResult};
use crate::validation::present;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/quote", get(quote))
        .route("/swap", post(swap))
        .route("/price/:token", get(price))
        .route("/balances/:wallet", get(balances))
        .route("/token/metadata/:token", get(token_metadata))
        .route("/tokens", get(tokens))
        .route("/token-list", get(token_list))
        .route("/transaction/:hash", get(transaction))
        .route("/block/:hash", get(block))
        .route("/gas-price", get(gas_price))
        .route("/cross-chain/quote", get(cross_chain_quote))
        .route("/cross-chain/swap", post(cross_chain_swap))
        .route("/chains", get(chains))
        .route("/protocols", get(protocols))
        .route("/liquidity-sources", get(liquidity_sources))
        .route("/validate", post(validate))
        .route("/limit-order/quote", get(limit_order_quote))
        .route("/limit-order", post(create_limit_order))
}

fn relay(result: Result<Value, OneInchError>, failure: &str) -> ApiResult<Value> {
    result
        .map(ApiResponse::ok)
        .map_err(|err| ApiError::upstream(failure, err))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainQuery {
    #[serde(default)]
    chain_id: ChainId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteQuery {
    src_token: Option<String>,
    dst_token: Option<String>,
    amount: Option<String>,
    #[serde(default)]
    chain_id: ChainId,
    from: Option<String>,
    slippage: Option<Decimal>,
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
    let options = SwapQuoteOptions {
        from: present(query.from),
        slippage: query.slippage,
    };
    relay(
        state
            .oneinch
            .get_swap_quote(&src, &dst, &amount, query.chain_id, &options)
            .await,
        "Failed to get swap quote",
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapBody {
    swap_data: Option<Value>,
    #[serde(default)]
    chain_id: ChainId,
}

async fn swap(State(state): State<AppState>, ApiJson(body): ApiJson<SwapBody>) -> ApiResult<Value> {
    let swap_data = body
        .swap_data
        .filter(|data| !data.is_null())
        .ok_or_else(|| ApiError::missing_parameters(&["swapData"]))?;
    relay(
        state.oneinch.execute_swap(&swap_data, body.chain_id).await,
        "Failed to execute swap",
    )
}

async fn price(
    State(state): State<AppState>,
    ApiPath(token): ApiPath<String>,
    ApiQuery(query): ApiQuery<ChainQuery>,
) -> ApiResult<Value> {
    relay(
        state.oneinch.get_token_price(&token, query.chain_id).await,
        "Failed to get token price",
    )
}

async fn balances(
    State(state): State<AppState>,
    ApiPath(wallet): ApiPath<String>,
    ApiQuery(query): ApiQuery<ChainQuery>,
) -> ApiResult<Value> {
    relay(
        state.oneinch.get_wallet_balances(&wallet, query.chain_id).await,
        "Failed to get wallet balances",
    )
}

async fn token_metadata(
    State(state): State<AppState>,
    ApiPath(token): ApiPath<String>,
    ApiQuery(query): ApiQuery<ChainQuery>,
) -> ApiResult<Value> {
    relay(
        state.oneinch.get_token_metadata(&token, query.chain_id).await,
        "Failed to get token metadata",
    )
}

async fn tokens(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ChainQuery>,
) -> ApiResult<Value> {
    relay(
        state.oneinch.get_supported_tokens(query.chain_id).await,
        "Failed to get supported tokens",
    )
}

async fn token_list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ChainQuery>,
) -> ApiResult<Value> {
    relay(
        state.oneinch.get_token_list(query.chain_id).await,
        "Failed to get token list",
    )
}

async fn transaction(
    State(state): State<AppState>,
    ApiPath(hash): ApiPath<String>,
    ApiQuery(query): ApiQuery<ChainQuery>,
) -> ApiResult<Value> {
    relay(
        state.oneinch.get_transaction_status(&hash, query.chain_id).await,
        "Failed to get transaction status",
    )
}

async fn block(
    State(state): State<AppState>,
    ApiPath(hash): ApiPath<String>,
    ApiQuery(query): ApiQuery<ChainQuery>,
) -> ApiResult<Value> {
    relay(
        state.oneinch.get_block_info(&hash, query.chain_id).await,
        "Failed to get block info",
    )
}

async fn gas_price(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ChainQuery>,
) -> ApiResult<Value> {
    relay(
        state.oneinch.get_gas_price(query.chain_id).await,
        "Failed to get gas price",
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossChainQuoteQuery {
    src_token: Option<String>,
    dst_token: Option<String>,
    amount: Option<String>,
    src_chain_id: Option<ChainId>,
    dst_chain_id: Option<ChainId>,
}

async fn cross_chain_quote(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<CrossChainQuoteQuery>,
) -> ApiResult<Value> {
    let (Some(src), Some(dst), Some(amount), Some(src_chain), Some(dst_chain)) = (
        present(query.src_token),
        present(query.dst_token),
        present(query.amount),
        query.src_chain_id,
        query.dst_chain_id,
    ) else {
        return Err(ApiError::missing_parameters(&[
            "srcToken",
            "dstToken",
            "amount",
            "srcChainId",
            "dstChainId",
        ]));
    };
    relay(
        state
            .oneinch
            .get_cross_chain_swap_quote(&src, &dst, &amount, src_chain, dst_chain)
            .await,
        "Failed to get cross-chain swap quote",
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossChainSwapBody {
    swap_data: Option<Value>,
}

async fn cross_chain_swap(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CrossChainSwapBody>,
) -> ApiResult<Value> {
    let swap_data = body
        .swap_data
        .filter(|data| !data.is_null())
        .ok_or_else(|| ApiError::missing_parameters(&["swapData"]))?;
    relay(
        state.oneinch.execute_cross_chain_swap(&swap_data).await,
        "Failed to execute cross-chain swap",
    )
}

async fn chains(State(state): State<AppState>) -> ApiResult<Value> {
    relay(
        state.oneinch.get_supported_chains().await,
        "Failed to get supported chains",
    )
}

async fn protocols(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ChainQuery>,
) -> ApiResult<Value> {
    relay(
        state.oneinch.get_protocols(query.chain_id).await,
        "Failed to get protocols",
    )
}

async fn liquidity_sources(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ChainQuery>,
) -> ApiResult<Value> {
    relay(
        state.oneinch.get_liquidity_sources(query.chain_id).await,
        "Failed to get liquidity sources",
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateBody {
    tx_data: Option<Value>,
    #[serde(default)]
    chain_id: ChainId,
}

async fn validate(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ValidateBody>,
) -> ApiResult<Value> {
    let tx_data = body
        .tx_data
        .filter(|data| !data.is_null())
        .ok_or_else(|| ApiError::missing_parameters(&["txData"]))?;
    relay(
        state
            .oneinch
            .validate_transaction(&tx_data, body.chain_id)
            .await,
        "Failed to validate transaction",
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitOrderQuoteQuery {
    src_token: Option<String>,
    dst_token: Option<String>,
    amount: Option<String>,
    #[serde(default)]
    chain_id: ChainId,
}

async fn limit_order_quote(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<LimitOrderQuoteQuery>,
) -> ApiResult<Value> {
    let (Some(src), Some(dst), Some(amount)) = (
        present(query.src_token),
        present(query.dst_token),
        present(query.amount),
    ) else {
        return Err(ApiError::missing_parameters(&["srcToken", "dstToken", "amount"]));
    };
    relay(
        state
            .oneinch
            .get_limit_order_quote(&src, &dst, &amount, query.chain_id)
            .await,
        "Failed to get limit order quote",
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitOrderBody {
    order: Option<Value>,
    #[serde(default)]
    chain_id: ChainId,
}

async fn create_limit_order(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LimitOrderBody>,
) -> ApiResult<Value> {
    let order = body
        .order
        .filter(|order| !order.is_null())
        .ok_or_else(|| ApiError::missing_parameters(&["order"]))?;
    relay(
        state.oneinch.create_limit_order(&order, body.chain_id).await,
        "Failed to create limit order",
    )
}
