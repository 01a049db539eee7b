//! Uniform API result returned by every endpoint.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::AppError;

/// Outcome class carried in [`ApiResponse::status`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    /// Request handled.
    Success,
    /// Request rejected or failed.
    Error,
}

/// `{code, status, message, data?}` envelope; `code` is mirrored into the
/// HTTP status line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiResponse {
    /// HTTP-equivalent status code.
    pub code: u16,
    /// Success or error.
    pub status: ResponseStatus,
    /// Human-readable summary.
    pub message: String,
    /// Optional result payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ApiResponse {
    /// 200 response.
    pub fn success(message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            code: StatusCode::OK.as_u16(),
            status: ResponseStatus::Success,
            message: message.into(),
            data,
        }
    }

    /// 400 response.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            code: StatusCode::BAD_REQUEST.as_u16(),
            status: ResponseStatus::Error,
            message: message.into(),
            data: None,
        }
    }

    /// Attach a data payload.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Whether the status is [`ResponseStatus::Success`].
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }
}

impl From<&AppError> for ApiResponse {
    fn from(err: &AppError) -> Self {
        match err {
            AppError::NotFound(msg) => Self {
                code: StatusCode::NOT_FOUND.as_u16(),
                status: ResponseStatus::Error,
                message: msg.clone(),
                data: None,
            },
            other => Self::bad_request(other.message()),
        }
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}
