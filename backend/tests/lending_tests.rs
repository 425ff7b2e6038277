mod helpers;

use axum::http::StatusCode;
use helpers::{decimal, TestContext, OTHER_ADDRESS};
use rust_decimal::Decimal;
use serde_json::json;

async fn deposit(ctx: &TestContext, token: &str, amount: &str) -> (StatusCode, serde_json::Value) {
    ctx.post(
        "/api/v1/lending/deposit",
        json!({ "userAddress": OTHER_ADDRESS, "token": token, "amount": amount }),
    )
    .await
}

#[tokio::test]
async fn deposit_then_borrow_yields_expected_health_factor() {
    let ctx = TestContext::new().await;

    let (status, body) = deposit(&ctx, "stETH", "25").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Deposit successful");
    assert_eq!(body["data"]["type"], "deposit");
    assert_eq!(
        decimal(&body["data"]["position"]["totalCollateralValue"]),
        Decimal::new(50_000, 0)
    );

    let (status, body) = ctx
        .post(
            "/api/v1/lending/borrow",
            json!({ "userAddress": OTHER_ADDRESS, "token": "USDC", "amount": 25000 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Borrow successful");
    assert_eq!(
        decimal(&body["data"]["position"]["healthFactor"]),
        Decimal::new(16, 1)
    );

    let (status, body) = ctx
        .get(&format!("/api/v1/lending/user/{OTHER_ADDRESS}"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        decimal(&body["data"]["totalBorrowValue"]),
        Decimal::new(25_000, 0)
    );
}

#[tokio::test]
async fn borrow_beyond_ltv_is_rejected() {
    let ctx = TestContext::new().await;
    deposit(&ctx, "stETH", "1").await;

    let (status, body) = ctx
        .post(
            "/api/v1/lending/borrow",
            json!({ "userAddress": OTHER_ADDRESS, "token": "USDC", "amount": "1601" }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("Insufficient collateral"));
}

#[tokio::test]
async fn borrow_without_collateral_is_rejected() {
    let ctx = TestContext::new().await;

    let (status, body) = ctx
        .post(
            "/api/v1/lending/borrow",
            json!({ "userAddress": OTHER_ADDRESS, "token": "USDC", "amount": "10" }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No collateral deposited");
}

#[tokio::test]
async fn repay_without_position_returns_404() {
    let ctx = TestContext::new().await;

    let (status, body) = ctx
        .post(
            "/api/v1/lending/repay",
            json!({ "userAddress": OTHER_ADDRESS, "token": "USDC", "amount": "10" }),
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "No user data found");
}

#[tokio::test]
async fn overpaying_clears_debt_without_going_negative() {
    let ctx = TestContext::new().await;
    deposit(&ctx, "rETH", "10").await;
    ctx.post(
        "/api/v1/lending/borrow",
        json!({ "userAddress": OTHER_ADDRESS, "token": "USDC", "amount": "1000" }),
    )
    .await;

    let (status, body) = ctx
        .post(
            "/api/v1/lending/repay",
            json!({ "userAddress": OTHER_ADDRESS, "token": "USDC", "amount": "5000" }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Repayment successful");
    assert_eq!(
        decimal(&body["data"]["position"]["totalBorrowValue"]),
        Decimal::ZERO
    );
    assert_eq!(decimal(&body["data"]["position"]["healthFactor"]), Decimal::ZERO);
}

#[tokio::test]
async fn invalid_requests_are_rejected_before_mutation() {
    let ctx = TestContext::new().await;

    let (status, body) = ctx
        .post("/api/v1/lending/deposit", json!({ "token": "stETH", "amount": "1" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Missing required parameters: userAddress, token, amount"
    );

    let (status, body) = ctx
        .post(
            "/api/v1/lending/deposit",
            json!({ "userAddress": "0x123", "token": "stETH", "amount": "1" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid address");

    let (status, _) = deposit(&ctx, "stETH", "-5").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = deposit(&ctx, "DOGE", "5").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = ctx.get("/api/v1/lending/overview").await;
    assert_eq!(body["data"]["totalTransactions"], 0);
}

#[tokio::test]
async fn malformed_json_body_is_a_400_envelope() {
    let ctx = TestContext::new().await;

    let (status, body) = ctx
        .send(
            axum::http::Method::POST,
            "/api/v1/lending/deposit",
            Some(json!(["not", "an", "object"])),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn unknown_user_gets_an_empty_position() {
    let ctx = TestContext::new().await;

    let (status, body) = ctx
        .get(&format!("/api/v1/lending/user/{OTHER_ADDRESS}"))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&body["data"]["totalCollateralValue"]), Decimal::ZERO);
    assert_eq!(body["data"]["collaterals"], json!([]));
}

#[tokio::test]
async fn overview_and_supported_tokens() {
    let ctx = TestContext::new().await;
    deposit(&ctx, "stETH", "2").await;

    let (status, body) = ctx.get("/api/v1/lending/overview").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&body["data"]["totalTVL"]), Decimal::new(4000, 0));
    assert_eq!(body["data"]["totalUsers"], 1);
    assert_eq!(body["data"]["supportedTokens"], json!(["stETH", "rETH", "USDC"]));

    let (status, body) = ctx.get("/api/v1/lending/supported-tokens").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["collateral"][0]["symbol"], "stETH");
    assert_eq!(body["data"]["collateral"][0]["isLST"], true);
    assert_eq!(body["data"]["borrow"][0]["symbol"], "USDC");
}
