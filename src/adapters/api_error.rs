//! Caller-facing error responses
//!
//! Every [`AgentError`] is translated here and nowhere else. Bodies carry a
//! stable code and a fixed message; the underlying error is only logged.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agents::error::AgentError;

pub const MSG_AGENT: &str = "Failed to process your query. Please try again.";
pub const MSG_LLM: &str = "The AI service is currently unavailable. Please try again later.";
pub const MSG_TIMEOUT: &str = "Request timed out while processing your query";
pub const MSG_INTERNAL: &str = "An unexpected error occurred. Please try again later.";

/// Error response body.
///
/// ```json
/// { "error": "LLM_ERROR", "detail": "...", "timestamp": "...", "request_id": "..." }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub detail: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    detail: String,
    request_id: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, detail: impl Into<String>) -> Self {
        Self {
            status,
            code,
            detail: detail.into(),
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.code.to_string(),
            detail: self.detail,
            timestamp: Utc::now(),
            request_id: self.request_id,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<AgentError> for ApiError {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::Validation(msg) => Self::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg),
            AgentError::TemplateNotFound(_) | AgentError::TemplateRender(_) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "AGENT_ERROR", MSG_AGENT)
            }
            AgentError::Llm(_) => Self::new(StatusCode::BAD_GATEWAY, "LLM_ERROR", MSG_LLM),
            AgentError::Timeout(_) => Self::new(StatusCode::GATEWAY_TIMEOUT, "TIMEOUT", MSG_TIMEOUT),
            AgentError::ExhaustedStream | AgentError::Configuration(_) | AgentError::Internal(_) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_SERVER_ERROR", MSG_INTERNAL)
            }
        }
    }
}
