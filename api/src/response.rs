//! API response types and utilities

use axum::{http::StatusCode, Json};
use hyperv_security::Error;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn error(message: &str) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message.to_string()),
        }
    }
}

pub type ApiError = (StatusCode, Json<ApiResponse<()>>);

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// HTTP status for a security operation error.
pub fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::Validation { .. } | Error::TooManySettings { .. } => StatusCode::BAD_REQUEST,
        Error::AccessDenied(_) => StatusCode::FORBIDDEN,
        Error::Decode { .. } => StatusCode::BAD_GATEWAY,
        Error::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<Error> for ApiResponse<()> {
    fn from(err: Error) -> Self {
        ApiResponse::error(&err.to_string())
    }
}

/// Map a security operation error to an API error.
pub fn security_error(err: Error) -> ApiError {
    let status = status_for(&err);
    if status.is_server_error() {
        tracing::error!(error = %err, "security operation failed");
    } else {
        tracing::warn!(error = %err, "security request rejected");
    }
    (status, Json(err.into()))
}
