//! OpenAI-compatible chat-completions client with streaming support

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{json, Value};
use std::env;
use std::time::Duration;

use super::{
    CompletionRequest, CompletionResponse, FinishReason, LlmClient, LlmStream, LlmStreamSender,
    StreamChunk,
};
use crate::agents::config::LlmProviderConfig;
use crate::agents::domain::{Message, TokenUsage};
use crate::agents::error::{LlmError, LlmResult};

/// OpenAI chat-completions client
pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    default_temperature: Option<f32>,
    default_max_tokens: Option<u32>,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl OpenAiClient {
    /// Create a client, reading the API key from the configured environment variable
    pub fn new(config: &LlmProviderConfig) -> LlmResult<Self> {
        let api_key = env::var(&config.api_key_env).map_err(|_| {
            LlmError::Authentication(format!(
                "Environment variable {} not set",
                config.api_key_env
            ))
        })?;

        Self::with_api_key(config, api_key)
    }

    /// Create a client with an explicit API key
    pub fn with_api_key(config: &LlmProviderConfig, api_key: impl Into<String>) -> LlmResult<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LlmError::Authentication("API key is empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            default_temperature: config.temperature,
            default_max_tokens: config.max_tokens,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Build the request body for the chat-completions API
    fn build_request_body(&self, request: &CompletionRequest) -> Value {
        let messages: Vec<Value> = request
            .messages
            .iter()
            .map(|m| json!({ "role": m.role.as_str(), "content": m.content }))
            .collect();

        let mut body = json!({
            "model": request.model.as_ref().unwrap_or(&self.model),
            "messages": messages,
        });

        if let Some(temp) = request.temperature.or(self.default_temperature) {
            body["temperature"] = json!(temp);
        }

        if let Some(max_tokens) = request.max_tokens.or(self.default_max_tokens) {
            body["max_tokens"] = json!(max_tokens);
        }

        if request.stream {
            body["stream"] = json!(true);
            body["stream_options"] = json!({ "include_usage": true });
        }

        body
    }

    async fn send(client: &reqwest::Client, url: String, api_key: &str, body: &Value) -> LlmResult<reqwest::Response> {
        let response = client
            .post(url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after_ms = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .map(|secs| secs * 1000);
        let error_text = response.text().await.unwrap_or_default();

        Err(match status.as_u16() {
            401 | 403 => LlmError::Authentication(error_text),
            429 => LlmError::RateLimited {
                retry_after_ms: retry_after_ms.unwrap_or(0),
            },
            code => LlmError::Api {
                status: code,
                message: error_text,
            },
        })
    }

    /// Parse a non-streaming response
    fn parse_response(response: OpenAiResponse) -> LlmResult<CompletionResponse> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::Parse("No choices in response".to_string()))?;

        Ok(CompletionResponse {
            message: Message::assistant(choice.message.content.unwrap_or_default()),
            finish_reason: choice
                .finish_reason
                .as_deref()
                .map(FinishReason::from_wire)
                .unwrap_or(FinishReason::Stop),
            usage: response.usage.map(Into::into),
        })
    }

    async fn stream_completion(
        client: reqwest::Client,
        url: String,
        api_key: String,
        body: Value,
        sender: LlmStreamSender,
    ) -> LlmResult<()> {
        let response = tokio::select! {
            _ = sender.closed() => return Ok(()),
            response = Self::send(&client, url, &api_key, &body) => response?,
        };

        let mut stream = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();

        loop {
            // Stop as soon as the consumer goes away, even mid-wait
            let next = tokio::select! {
                _ = sender.closed() => return Ok(()),
                next = stream.next() => next,
            };

            let Some(bytes) = next else {
                // The last line may arrive without its trailing newline
                let rest = String::from_utf8_lossy(&buffer).into_owned();
                if Self::forward_line(&rest, &sender).await? {
                    return Ok(());
                }
                return Err(LlmError::Streaming(
                    "stream ended before [DONE]".to_string(),
                ));
            };
            let bytes = bytes.map_err(|e| LlmError::Streaming(e.to_string()))?;
            buffer.extend_from_slice(&bytes);

            // Lines are split on bytes so multi-byte characters spanning
            // network chunks stay intact
            while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                let line_bytes: Vec<u8> = buffer.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&line_bytes);

                if Self::forward_line(&line, &sender).await? {
                    return Ok(());
                }
            }
        }
    }

    /// Forward one SSE line to the consumer. Returns `true` once nothing
    /// more should be read: `[DONE]` arrived or the receiver is gone.
    async fn forward_line(line: &str, sender: &LlmStreamSender) -> LlmResult<bool> {
        match parse_sse_line(line)? {
            SseLine::Chunk(chunk) => Ok(sender.send(chunk).await.is_err()),
            SseLine::Done => Ok(true),
            SseLine::Skip => Ok(false),
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> LlmResult<CompletionResponse> {
        let mut req = request;
        req.stream = false;
        let body = self.build_request_body(&req);

        let response = Self::send(&self.client, self.endpoint(), &self.api_key, &body).await?;

        let openai_response: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(format!("Failed to parse response: {}", e)))?;

        Self::parse_response(openai_response)
    }

    fn complete_stream(&self, request: CompletionRequest) -> LlmStream {
        let (sender, stream) = LlmStream::channel(64);

        let client = self.client.clone();
        let api_key = self.api_key.clone();
        let url = self.endpoint();
        let mut req = request;
        req.stream = true;
        let body = self.build_request_body(&req);

        tokio::spawn(async move {
            let result = Self::stream_completion(client, url, api_key, body, sender.clone()).await;
            if let Err(e) = result {
                tracing::warn!("LLM stream failed: {}", e);
                let _ = sender.send_error(e).await;
            }
        });

        stream
    }
}

/// Outcome of parsing one SSE line
#[derive(Debug, PartialEq)]
enum SseLine {
    Chunk(StreamChunk),
    Done,
    Skip,
}

/// Parse one line of the chat-completions event stream
fn parse_sse_line(line: &str) -> LlmResult<SseLine> {
    let line = line.trim();
    let Some(data) = line.strip_prefix("data:") else {
        // Blank separators, comments and `event:` lines
        return Ok(SseLine::Skip);
    };

    let data = data.trim_start();
    if data == "[DONE]" {
        return Ok(SseLine::Done);
    }

    let parsed: OpenAiStreamResponse = serde_json::from_str(data)
        .map_err(|e| LlmError::Parse(format!("Invalid stream event: {}", e)))?;

    if let Some(error) = parsed.error {
        return Err(LlmError::Streaming(error.message));
    }

    let choice = parsed.choices.into_iter().next();
    let (content, finish_reason) = match choice {
        Some(choice) => (
            choice.delta.content.unwrap_or_default(),
            choice.finish_reason.as_deref().map(FinishReason::from_wire),
        ),
        None => (String::new(), None),
    };

    Ok(SseLine::Chunk(StreamChunk {
        content,
        finish_reason,
        usage: parsed.usage.map(Into::into),
    }))
}

// OpenAI API response types

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

impl From<OpenAiUsage> for TokenUsage {
    fn from(u: OpenAiUsage) -> Self {
        TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamResponse {
    #[serde(default)]
    choices: Vec<OpenAiStreamChoice>,
    usage: Option<OpenAiUsage>,
    error: Option<OpenAiStreamError>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChoice {
    delta: OpenAiDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiDelta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamError {
    message: String,
}
