use axum::Json;
use serde::Serialize;

use crate::error::ApiError;

/// Uniform `{success, message?, data?, error?}` envelope returned by every route.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: None,
            data: Some(data),
            error: None,
        })
    }

    pub fn ok_with_message(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
            error: None,
        })
    }
}

impl ApiResponse<()> {
    pub fn failure(message: impl Into<String>, error: Option<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_envelope_omits_empty_fields() {
        let Json(body) = ApiResponse::ok(json!({ "a": 1 }));
        let value = serde_json::to_value(body).unwrap();
        assert_eq!(value, json!({ "success": true, "data": { "a": 1 } }));
    }

    #[test]
    fn failure_envelope_carries_error_only_when_given() {
        let value = serde_json::to_value(ApiResponse::failure("Loan not found", None)).unwrap();
        assert_eq!(value, json!({ "success": false, "message": "Loan not found" }));

        let value =
            serde_json::to_value(ApiResponse::failure("Failed", Some("timeout".into()))).unwrap();
        assert_eq!(value["error"], "timeout");
    }
}
