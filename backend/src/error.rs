use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Request, State,
    },
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::app::AppState;
use crate::interest::SettlementError;
use crate::ledger::{LedgerError, StoreError};
use crate::lst::AutoRepayError;
use crate::oneinch::OneInchError;
use crate::prime::PrimeError;
use crate::response::ApiResponse;
use crate::scheduler::ScheduleError;
use crate::users::ProfileError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{message}")]
    Upstream {
        message: String,
        #[source]
        source: OneInchError,
    },

    #[error("{message}")]
    Internal {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Internal detail attached to error responses, surfaced to clients only
/// when the deployment allows it (see [`expose_error_details`]).
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub message: String,
    pub detail: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn missing_parameters(names: &[&str]) -> Self {
        let noun = if names.len() == 1 { "parameter" } else { "parameters" };
        Self::BadRequest(format!("Missing required {noun}: {}", names.join(", ")))
    }

    pub fn upstream(message: impl Into<String>, source: OneInchError) -> Self {
        Self::Upstream {
            message: message.into(),
            source,
        }
    }

    pub fn internal(message: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::Internal {
            message: message.into(),
            source: source.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Upstream { .. } | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self) -> Option<String> {
        match self {
            Self::Upstream { source, .. } => Some(source.to_string()),
            Self::Internal { source, .. } => Some(format!("{source:#}")),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        let detail = self.detail();

        if status.is_server_error() {
            tracing::error!(%status, error = ?self, "request failed");
        } else {
            tracing::warn!(%status, %message, "request rejected");
        }

        let mut response = (status, Json(ApiResponse::failure(message.clone(), None))).into_response();
        if let Some(detail) = detail {
            response
                .extensions_mut()
                .insert(ErrorReport { message, detail });
        }
        response
    }
}

/// Rewrites failed responses to carry the internal error detail in the
/// `error` field. Only active in development.
pub async fn expose_error_details(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    if !state.config.exposes_error_details() {
        return response;
    }
    let Some(report) = response.extensions().get::<ErrorReport>().cloned() else {
        return response;
    };

    let status = response.status();
    (
        status,
        Json(ApiResponse::failure(report.message, Some(report.detail))),
    )
        .into_response()
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(format!("Invalid query parameters: {}", rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(format!("Invalid path parameter: {}", rejection.body_text()))
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::internal("Storage unavailable", err)
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::PositionNotFound(_) => Self::NotFound("No user data found".to_string()),
            LedgerError::Store(err) => err.into(),
            other => Self::BadRequest(other.to_string()),
        }
    }
}

impl From<ScheduleError> for ApiError {
    fn from(err: ScheduleError) -> Self {
        match err {
            ScheduleError::NotFound(_) => Self::NotFound("Schedule not found".to_string()),
            ScheduleError::Id(source) => Self::internal("Failed to generate identifier", source),
            other => Self::BadRequest(other.to_string()),
        }
    }
}

impl From<SettlementError> for ApiError {
    fn from(err: SettlementError) -> Self {
        match err {
            SettlementError::InFlight(_) => Self::Conflict(err.to_string()),
            SettlementError::Swap(source) => {
                Self::upstream("Failed to execute interest settlement", source)
            }
            other => Self::BadRequest(other.to_string()),
        }
    }
}

impl From<AutoRepayError> for ApiError {
    fn from(err: AutoRepayError) -> Self {
        match err {
            AutoRepayError::Swap(source) => Self::upstream("Failed to execute auto-repay", source),
            AutoRepayError::InFlight => Self::Conflict(err.to_string()),
            other => Self::BadRequest(other.to_string()),
        }
    }
}

impl From<PrimeError> for ApiError {
    fn from(err: PrimeError) -> Self {
        match err {
            PrimeError::LoanNotFound(_)
            | PrimeError::BridgeNotFound(_)
            | PrimeError::SwapNotFound(_) => Self::NotFound(err.to_string()),
            PrimeError::Swap(source) => Self::upstream("Failed to execute cross-chain swap", source),
            PrimeError::Id(source) => Self::internal("Failed to generate identifier", source),
            PrimeError::Aborted(source) => {
                Self::internal("Failed to execute cross-chain swap", source)
            }
            other => Self::BadRequest(other.to_string()),
        }
    }
}

impl From<ProfileError> for ApiError {
    fn from(err: ProfileError) -> Self {
        match err {
            ProfileError::NotFound(_) => Self::NotFound("User not found".to_string()),
            other => Self::BadRequest(other.to_string()),
        }
    }
}
