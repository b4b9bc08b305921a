use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::downloader::DownloadError;
use crate::task::RegistryError;

/// HTTP 处理函数的错误类型，统一转换为 JSON 响应
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("Request timeout")]
    UpstreamTimeout,

    #[error("not_found")]
    TaskNotFound,

    #[error("File not ready")]
    FileNotReady,

    #[error("{0}")]
    Busy(String),

    #[error("{0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<DownloadError> for ApiError {
    fn from(err: DownloadError) -> Self {
        match err {
            DownloadError::Timeout(_) => ApiError::UpstreamTimeout,
            DownloadError::TooManyTasks(_) => ApiError::Busy(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(_: RegistryError) -> Self {
        ApiError::FileNotReady
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            ApiError::TaskNotFound | ApiError::FileNotReady => StatusCode::NOT_FOUND,
            ApiError::Busy(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(msg) => {
                error!("内部错误: {}", msg);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = match self {
            ApiError::TaskNotFound => json!({ "status": "not_found" }),
            other => json!({ "error": other.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}
