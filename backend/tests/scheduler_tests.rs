mod helpers;

use axum::http::StatusCode;
use chrono::{DateTime, Duration, Utc};
use helpers::{TestContext, DEMO_ADDRESS, OTHER_ADDRESS};
use serde_json::{json, Value};

const LOAN_ID: &str = "0x1234567890123456789012345678901234567890123456789012345678901234";

fn timestamp(value: &Value) -> DateTime<Utc> {
    value
        .as_str()
        .expect("timestamp string")
        .parse()
        .expect("RFC 3339 timestamp")
}

async fn setup(ctx: &TestContext, frequency: &str) -> (StatusCode, Value) {
    ctx.post(
        "/api/v1/scheduler/setup-auto-repay",
        json!({
            "userAddress": OTHER_ADDRESS,
            "loanId": LOAN_ID,
            "lstToken": "stETH",
            "frequency": frequency,
        }),
    )
    .await
}

#[tokio::test]
async fn setup_creates_an_active_schedule_one_period_out() {
    let ctx = TestContext::new().await;
    let before = Utc::now();

    let (status, body) = setup(&ctx, "weekly").await;

    assert_eq!(status, StatusCode::OK);
    let schedule = &body["data"];
    assert_eq!(schedule["status"], "active");
    assert_eq!(schedule["frequency"], "weekly");
    let id = schedule["scheduleId"].as_str().unwrap();
    assert!(id.starts_with("0x") && id.len() == 66);
    let next = timestamp(&schedule["nextExecution"]);
    assert!(next >= before + Duration::days(7));
    assert!(next <= Utc::now() + Duration::days(7));

    let (_, body) = ctx
        .get(&format!("/api/v1/scheduler/user-schedules/{OTHER_ADDRESS}"))
        .await;
    assert_eq!(body["data"]["autoRepayEnabled"], true);
    assert_eq!(body["data"]["totalSchedules"], 1);
    assert_eq!(body["data"]["activeSchedules"], 1);
}

#[tokio::test]
async fn setup_rejects_bad_input() {
    let ctx = TestContext::new().await;

    let (status, body) = setup(&ctx, "hourly").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Invalid frequency. Must be daily, weekly, or monthly"
    );

    let (status, _) = ctx
        .post(
            "/api/v1/scheduler/setup-auto-repay",
            json!({
                "userAddress": OTHER_ADDRESS,
                "loanId": LOAN_ID,
                "lstToken": "USDC",
                "frequency": "daily",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = ctx
        .post(
            "/api/v1/scheduler/setup-auto-repay",
            json!({ "userAddress": OTHER_ADDRESS }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Missing required parameters: userAddress, loanId, lstToken, frequency"
    );
}

#[tokio::test]
async fn execute_advances_by_the_frequency_period() {
    let ctx = TestContext::new().await;
    let (_, body) = setup(&ctx, "daily").await;
    let id = body["data"]["scheduleId"].as_str().unwrap().to_string();

    let (status, body) = ctx
        .post(&format!("/api/v1/scheduler/execute-schedule/{id}"), json!({}))
        .await;

    assert_eq!(status, StatusCode::OK);
    let executed_at = timestamp(&body["data"]["executedAt"]);
    let next = timestamp(&body["data"]["nextExecution"]);
    assert_eq!(next - executed_at, Duration::days(1));
}

#[tokio::test]
async fn paused_schedules_cannot_execute() {
    let ctx = TestContext::new().await;
    let (_, body) = setup(&ctx, "monthly").await;
    let id = body["data"]["scheduleId"].as_str().unwrap().to_string();

    let (status, body) = ctx
        .put(
            &format!("/api/v1/scheduler/update-schedule/{id}"),
            json!({ "status": "paused", "frequency": "weekly" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "paused");
    assert_eq!(body["data"]["frequency"], "weekly");

    let (status, body) = ctx
        .post(&format!("/api/v1/scheduler/execute-schedule/{id}"), json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Schedule is not active");

    let (status, _) = ctx
        .put(
            &format!("/api/v1/scheduler/update-schedule/{id}"),
            json!({ "status": "sleeping" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_schedules_return_404() {
    let ctx = TestContext::new().await;

    let (status, body) = ctx.delete("/api/v1/scheduler/delete-schedule/0xnope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Schedule not found");

    let (status, _) = ctx
        .put("/api/v1/scheduler/update-schedule/0xnope", json!({ "status": "paused" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = ctx
        .post("/api/v1/scheduler/execute-schedule/0xnope", json!({}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_removes_the_schedule() {
    let ctx = TestContext::new().await;

    let (_, body) = ctx
        .get(&format!("/api/v1/scheduler/user-schedules/{DEMO_ADDRESS}"))
        .await;
    assert_eq!(body["data"]["totalSchedules"], 2);
    let id = body["data"]["schedules"][0]["scheduleId"]
        .as_str()
        .unwrap()
        .to_string();

    let (status, _) = ctx
        .delete(&format!("/api/v1/scheduler/delete-schedule/{id}"))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = ctx
        .get(&format!("/api/v1/scheduler/user-schedules/{DEMO_ADDRESS}"))
        .await;
    assert_eq!(body["data"]["totalSchedules"], 1);
}

#[tokio::test]
async fn driver_tick_only_runs_due_schedules() {
    let ctx = TestContext::new().await;
    setup(&ctx, "daily").await;

    // Nothing is due yet: the seeded and new schedules all sit in the future.
    let executed = ctx.state.schedules.execute_due(Utc::now()).await;
    assert!(executed.is_empty());

    let executed = ctx
        .state
        .schedules
        .execute_due(Utc::now() + Duration::days(2))
        .await;
    assert_eq!(executed.len(), 2);
}
