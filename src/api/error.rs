// src/api/error.rs
// Error responses for the HTTP API

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use tracing::{error, warn};

use crate::error::QuestError;

/// Standard API error response format
#[derive(Debug)]
pub struct ApiError {
    pub message: String,
    pub status_code: StatusCode,
    pub error_code: Option<String>,
}

impl ApiError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: StatusCode::INTERNAL_SERVER_ERROR,
            error_code: Some("INTERNAL_ERROR".to_string()),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: StatusCode::BAD_REQUEST,
            error_code: Some("BAD_REQUEST".to_string()),
        }
    }

    pub fn bad_gateway(message: impl Into<String>, error_code: &str) -> Self {
        Self {
            message: message.into(),
            status_code: StatusCode::BAD_GATEWAY,
            error_code: Some(error_code.to_string()),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response_json = json!({
            "error": true,
            "message": self.message,
            "status": self.status_code.as_u16()
        });

        if let Some(error_code) = self.error_code {
            response_json["error_code"] = json!(error_code);
        }

        (self.status_code, Json(response_json)).into_response()
    }
}

impl From<QuestError> for ApiError {
    fn from(err: QuestError) -> Self {
        let message = err.to_string();
        match err {
            QuestError::InvalidRequest(_) | QuestError::InvalidAttachment(_) | QuestError::Json(_) => {
                warn!("Rejected request: {}", message);
                ApiError::bad_request(message)
            }
            QuestError::ContextFetch(_) => {
                error!("{}", message);
                ApiError::bad_gateway(message, "CONTEXT_FETCH_FAILED")
            }
            QuestError::MalformedContext(_) => {
                error!("{}", message);
                ApiError::bad_gateway(message, "MALFORMED_CONTEXT")
            }
            QuestError::Completion(_) | QuestError::UpstreamStream(_) => {
                error!("{}", message);
                ApiError::bad_gateway(message, "COMPLETION_FAILED")
            }
            QuestError::ImageSearch(_) | QuestError::Http(_) => {
                error!("{}", message);
                ApiError::bad_gateway(message, "UPSTREAM_ERROR")
            }
            QuestError::Busy | QuestError::Config(_) | QuestError::Io(_) => {
                error!("{}", message);
                ApiError::internal(message)
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        warn!("Rejected request body: {}", rejection.body_text());
        ApiError::bad_request(rejection.body_text())
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;
