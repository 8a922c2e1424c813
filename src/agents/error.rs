//! Error types for the agent pipeline

use thiserror::Error;

/// Errors that can occur while answering a query
#[derive(Debug, Error)]
pub enum AgentError {
    /// Query rejected before any prompt was rendered
    #[error("Validation error: {0}")]
    Validation(String),

    /// No template exists under the requested identifier
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    /// Template could not be parsed or rendered
    #[error("Template render error: {0}")]
    TemplateRender(String),

    /// LLM provider error
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// An answer stream was read after it reached its terminal state
    #[error("Answer stream already consumed")]
    ExhaustedStream,

    /// Timeout
    #[error("Operation timed out after {0}s")]
    Timeout(u64),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AgentError {
    /// Short machine-readable label, used for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            AgentError::Validation(_) => "validation",
            AgentError::TemplateNotFound(_) => "template_not_found",
            AgentError::TemplateRender(_) => "template_render",
            AgentError::Llm(_) => "llm",
            AgentError::ExhaustedStream => "exhausted_stream",
            AgentError::Timeout(_) => "timeout",
            AgentError::Configuration(_) => "configuration",
            AgentError::Internal(_) => "internal",
        }
    }
}

/// Errors specific to LLM provider operations
#[derive(Debug, Error)]
pub enum LlmError {
    /// API error
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Rate limited
    #[error("Rate limited: retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Authentication error
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Network error
    #[error("Network error: {0}")]
    Network(String),

    /// Streaming error
    #[error("Streaming error: {0}")]
    Streaming(String),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Timeout
    #[error("Request timed out")]
    Timeout,
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else if err.is_connect() {
            LlmError::Network(format!("Connection error: {}", err))
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

/// Result type alias for agent operations
pub type AgentResult<T> = Result<T, AgentError>;

/// Result type alias for LLM operations
pub type LlmResult<T> = Result<T, LlmError>;
