//! LLM client capability
//!
//! Agents talk to a language model through the [`LlmClient`] trait. The
//! composition root builds one client with [`create_client`] and shares it
//! across requests; the underlying HTTP connection pool is reused.
//!
//! The only concrete client speaks the OpenAI chat-completions protocol,
//! which also covers OpenAI-compatible gateways via `base_url`.

mod openai;
mod stream;

pub use openai::OpenAiClient;
pub use stream::*;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::agents::config::LlmProviderConfig;
use crate::agents::domain::{Message, TokenUsage};
use crate::agents::error::LlmResult;

/// Trait for LLM clients
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;

    /// Complete a request (non-streaming)
    async fn complete(&self, request: CompletionRequest) -> LlmResult<CompletionResponse>;

    /// Complete a request with streaming.
    ///
    /// Failures, including ones that happen before the first chunk, are
    /// delivered as items of the returned stream.
    fn complete_stream(&self, request: CompletionRequest) -> LlmStream;
}

/// Request for LLM completion
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Messages in the conversation
    pub messages: Vec<Message>,
    /// Model to use (overrides client default)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Temperature for sampling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Whether to stream the response
    #[serde(default)]
    pub stream: bool,
}

/// Response from LLM completion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Generated message
    pub message: Message,
    /// Reason the completion stopped
    pub finish_reason: FinishReason,
    /// Token usage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

/// Reason completion stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural stop
    Stop,
    /// Hit max tokens
    Length,
    /// Content filtered
    ContentFilter,
}

impl FinishReason {
    /// Map the provider's wire value; unknown values count as a natural stop
    pub fn from_wire(value: &str) -> Self {
        match value {
            "length" => FinishReason::Length,
            "content_filter" => FinishReason::ContentFilter,
            _ => FinishReason::Stop,
        }
    }
}

/// Create the shared LLM client from configuration.
///
/// Fails when the API key environment variable is missing or empty.
pub fn create_client(config: &LlmProviderConfig) -> LlmResult<Arc<dyn LlmClient>> {
    let client = OpenAiClient::new(config)?;
    Ok(Arc::new(client))
}
