mod helpers;

use axum::http::StatusCode;
use helpers::TestContext;
use httpmock::prelude::*;
use serde_json::json;

const STETH: &str = "0xae7ab96520de3a18e5e111b5eaab095312d7fe84";
const USDC: &str = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";

#[tokio::test]
async fn quote_relays_upstream_json() {
    let ctx = TestContext::new().await;
    let upstream = ctx
        .upstream
        .mock_async(|when, then| {
            when.method(GET)
                .path("/swap/v6.0/137/quote")
                .query_param("src", STETH)
                .query_param("dst", USDC)
                .query_param("amount", "1000")
                .query_param("from", "0x0000000000000000000000000000000000000000")
                .query_param("slippage", "1");
            then.status(200).json_body(json!({ "dstAmount": "1999" }));
        })
        .await;

    let (status, body) = ctx
        .get(&format!(
            "/api/v1/1inch/quote?srcToken={STETH}&dstToken={USDC}&amount=1000&chainId=137&slippage=1"
        ))
        .await;

    upstream.assert_async().await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["dstAmount"], "1999");
}

#[tokio::test]
async fn quote_requires_tokens_and_amount() {
    let ctx = TestContext::new().await;

    let (status, body) = ctx.get(&format!("/api/v1/1inch/quote?srcToken={STETH}")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Missing required parameters: srcToken, dstToken, amount"
    );
}

#[tokio::test]
async fn upstream_failure_fails_closed() {
    let ctx = TestContext::new().await;
    ctx.upstream
        .mock_async(|when, then| {
            when.method(GET).path(format!("/price/v1.1/1/{STETH}"));
            then.status(503).body("maintenance");
        })
        .await;

    let (status, body) = ctx.get(&format!("/api/v1/1inch/price/{STETH}")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Failed to get token price");
    assert!(body.get("data").is_none());
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn development_mode_exposes_error_detail() {
    let ctx = TestContext::development().await;
    ctx.upstream
        .mock_async(|when, then| {
            when.method(GET).path("/web3/v1.0/1/gas-price");
            then.status(502).body("bad gateway");
        })
        .await;

    let (status, body) = ctx.get("/api/v1/1inch/gas-price").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Failed to get gas price");
    let detail = body["error"].as_str().expect("error detail");
    assert!(detail.contains("502"));
}

#[tokio::test]
async fn swap_posts_swap_data_to_the_requested_chain() {
    let ctx = TestContext::new().await;
    let upstream = ctx
        .upstream
        .mock_async(|when, then| {
            when.method(POST)
                .path("/swap/v6.0/42161/swap")
                .json_body(json!({ "src": STETH, "dst": USDC }));
            then.status(200).json_body(json!({ "txHash": "0xfeed" }));
        })
        .await;

    let (status, body) = ctx
        .post(
            "/api/v1/1inch/swap",
            json!({ "swapData": { "src": STETH, "dst": USDC }, "chainId": "42161" }),
        )
        .await;

    upstream.assert_async().await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["txHash"], "0xfeed");

    let (status, body) = ctx.post("/api/v1/1inch/swap", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Missing required parameter: swapData");
}

#[tokio::test]
async fn cross_chain_quote_needs_both_chains() {
    let ctx = TestContext::new().await;
    let upstream = ctx
        .upstream
        .mock_async(|when, then| {
            when.method(GET)
                .path("/fusion/v1.0/quote")
                .query_param("srcChainId", "1")
                .query_param("dstChainId", "137");
            then.status(200).json_body(json!({ "quoteId": "q-1" }));
        })
        .await;

    let (status, _) = ctx
        .get(&format!(
            "/api/v1/1inch/cross-chain/quote?srcToken={STETH}&dstToken={USDC}&amount=5&srcChainId=1"
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = ctx
        .get(&format!(
            "/api/v1/1inch/cross-chain/quote?srcToken={STETH}&dstToken={USDC}&amount=5&srcChainId=1&dstChainId=137"
        ))
        .await;
    upstream.assert_async().await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["quoteId"], "q-1");
}

#[tokio::test]
async fn chain_scoped_lookups_default_to_ethereum() {
    let ctx = TestContext::new().await;
    let tokens = ctx
        .upstream
        .mock_async(|when, then| {
            when.method(GET).path("/token/v1.2/1/tokens");
            then.status(200).json_body(json!({ "tokens": {} }));
        })
        .await;
    let block = ctx
        .upstream
        .mock_async(|when, then| {
            when.method(GET).path("/web3/v1.0/10/block/0xabc");
            then.status(200).json_body(json!({ "number": 42 }));
        })
        .await;

    let (status, _) = ctx.get("/api/v1/1inch/tokens").await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = ctx.get("/api/v1/1inch/block/0xabc?chainId=10").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["number"], 42);

    tokens.assert_async().await;
    block.assert_async().await;
}

#[tokio::test]
async fn invalid_chain_id_is_a_bad_request() {
    let ctx = TestContext::new().await;

    let (status, body) = ctx.get("/api/v1/1inch/gas-price?chainId=mainnet").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn limit_orders_round_trip_through_upstream() {
    let ctx = TestContext::new().await;
    let create = ctx
        .upstream
        .mock_async(|when, then| {
            when.method(POST).path("/limit-order/v3.0/1/order");
            then.status(201).json_body(json!({ "orderHash": "0xorder" }));
        })
        .await;

    let (status, body) = ctx
        .post("/api/v1/1inch/limit-order", json!({ "order": { "maker": "0x1" } }))
        .await;
    create.assert_async().await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["orderHash"], "0xorder");

    let (status, body) = ctx.post("/api/v1/1inch/validate", json!({ "chainId": 1 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Missing required parameter: txData");
}
