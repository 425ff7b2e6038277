use axum::{
    extract::State,
    routing::{delete, get, post, put},
    Router,
};
use chrono::Utc;
use serde::Deserialize;

use super::require_address;
use crate::app::AppState;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::response::{ApiResponse, ApiResult};
use crate::scheduler::{Execution, Frequency, RepaymentSchedule, ScheduleStatus, UserSchedules};
use crate::validation::present;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/setup-auto-repay", post(setup_auto_repay))
        .route("/user-schedules/:address", get(user_schedules))
        .route("/update-schedule/:id", put(update_schedule))
        .route("/delete-schedule/:id", delete(delete_schedule))
        .route("/execute-schedule/:id", post(execute_schedule))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupBody {
    user_address: Option<String>,
    loan_id: Option<String>,
    lst_token: Option<String>,
    frequency: Option<String>,
}

async fn setup_auto_repay(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<SetupBody>,
) -> ApiResult<RepaymentSchedule> {
    let (Some(address), Some(loan_id), Some(lst_token), Some(frequency)) = (
        present(body.user_address),
        present(body.loan_id),
        present(body.lst_token),
        present(body.frequency),
    ) else {
        return Err(ApiError::missing_parameters(&[
            "userAddress",
            "loanId",
            "lstToken",
            "frequency",
        ]));
    };
    require_address(&address)?;
    let frequency: Frequency = frequency.parse()?;

    let schedule = state
        .schedules
        .setup(&address, &loan_id, &lst_token, frequency, Utc::now())
        .await?;
    Ok(ApiResponse::ok_with_message(
        "Auto-repayment schedule created successfully",
        schedule,
    ))
}

async fn user_schedules(
    State(state): State<AppState>,
    ApiPath(address): ApiPath<String>,
) -> ApiResult<UserSchedules> {
    Ok(ApiResponse::ok(state.schedules.user_schedules(&address).await))
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateBody {
    frequency: Option<String>,
    status: Option<String>,
}

async fn update_schedule(
    State(state): State<AppState>,
    ApiPath(schedule_id): ApiPath<String>,
    ApiJson(body): ApiJson<UpdateBody>,
) -> ApiResult<RepaymentSchedule> {
    let frequency = present(body.frequency)
        .map(|value| value.parse::<Frequency>())
        .transpose()?;
    let status = present(body.status)
        .map(|value| value.parse::<ScheduleStatus>())
        .transpose()?;

    let schedule = state
        .schedules
        .update(&schedule_id, frequency, status)
        .await?;
    Ok(ApiResponse::ok_with_message(
        "Schedule updated successfully",
        schedule,
    ))
}

async fn delete_schedule(
    State(state): State<AppState>,
    ApiPath(schedule_id): ApiPath<String>,
) -> ApiResult<RepaymentSchedule> {
    let schedule = state.schedules.delete(&schedule_id).await?;
    Ok(ApiResponse::ok_with_message(
        "Schedule deleted successfully",
        schedule,
    ))
}

async fn execute_schedule(
    State(state): State<AppState>,
    ApiPath(schedule_id): ApiPath<String>,
) -> ApiResult<Execution> {
    let execution = state.schedules.execute(&schedule_id, Utc::now()).await?;
    Ok(ApiResponse::ok_with_message(
        "Schedule executed successfully",
        execution,
    ))
}
