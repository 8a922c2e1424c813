#![allow(dead_code)]

use agents_backend::adapters::chat_handler::ChatHandler;
use agents_backend::adapters::health_handler::HealthHandler;
use agents_backend::adapters::metrics_handler::{MetricsCollector, MetricsHandler};
use agents_backend::agents::config::{AgentConfig, QueryLimits};
use agents_backend::agents::core::ResearchAgent;
use agents_backend::agents::domain::Message;
use agents_backend::agents::error::{LlmError, LlmResult};
use agents_backend::agents::llm::{
    CompletionRequest, CompletionResponse, FinishReason, LlmClient, LlmStream,
};
use agents_backend::agents::prompt::{TemplateCachePolicy, TemplateStore};
use agents_backend::config::{Environment, ServerSettings};
use async_trait::async_trait;
use axum::Router;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// How a scripted call fails
#[derive(Debug, Clone, Copy)]
pub enum Failure {
    Network,
    Api,
    /// Never answers, so callers hit their timeout
    Hang,
}

impl Failure {
    fn error(self) -> LlmError {
        match self {
            Failure::Network => LlmError::Network("connection reset by 10.0.0.9".to_string()),
            Failure::Api => LlmError::Api {
                status: 500,
                message: "internal provider trace id=abc".to_string(),
            },
            Failure::Hang => LlmError::Timeout,
        }
    }
}

/// LLM client that replays configured fragments and counts its calls
pub struct ScriptedClient {
    fragments: Vec<String>,
    /// Fail instead of sending the fragment at this index
    fail_at: Option<(usize, Failure)>,
    calls: AtomicUsize,
}

impl ScriptedClient {
    pub fn new(fragments: &[&str]) -> Self {
        Self {
            fragments: fragments.iter().map(|f| f.to_string()).collect(),
            fail_at: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_at(mut self, index: usize, failure: Failure) -> Self {
        self.fail_at = Some((index, failure));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn complete(&self, _request: CompletionRequest) -> LlmResult<CompletionResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some((_, failure)) = self.fail_at {
            if let Failure::Hang = failure {
                futures::future::pending::<()>().await;
            }
            return Err(failure.error());
        }

        Ok(CompletionResponse {
            message: Message::assistant(self.fragments.concat()),
            finish_reason: FinishReason::Stop,
            usage: None,
        })
    }

    fn complete_stream(&self, _request: CompletionRequest) -> LlmStream {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let (sender, stream) = LlmStream::channel(64);
        let fragments = self.fragments.clone();
        let fail_at = self.fail_at;
        tokio::spawn(async move {
            for (i, fragment) in fragments.into_iter().enumerate() {
                if let Some((index, failure)) = fail_at {
                    if index == i {
                        if let Failure::Hang = failure {
                            sender.closed().await;
                            return;
                        }
                        let _ = sender.send_error(failure.error()).await;
                        return;
                    }
                }
                if sender.send_text(fragment).await.is_err() {
                    return;
                }
            }
        });
        stream
    }
}

pub const RESEARCH_TEMPLATE: &str = r#"
description: Single-pass research answer
system: You are a careful research assistant.
template: |
  Research the following question and answer concisely.
  Question: {{ query }}
"#;

/// A template directory holding `research.yaml`
pub fn prompts_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("research.yaml"), RESEARCH_TEMPLATE).unwrap();
    dir
}

pub fn agent_config() -> AgentConfig {
    AgentConfig {
        llm_timeout_secs: 1,
        fragment_timeout_secs: 1,
        limits: QueryLimits {
            min_length: 1,
            max_length: 200,
        },
        ..Default::default()
    }
}

pub fn research_agent(client: Arc<ScriptedClient>, dir: &TempDir, config: AgentConfig) -> ResearchAgent {
    let templates = Arc::new(TemplateStore::new(dir.path(), TemplateCachePolicy::Cached));
    ResearchAgent::new(config, client, templates)
}

/// Full router around a scripted client
pub fn app(client: Arc<ScriptedClient>, dir: &TempDir) -> Router {
    app_with_config(client, dir, agent_config())
}

pub fn app_with_config(client: Arc<ScriptedClient>, dir: &TempDir, config: AgentConfig) -> Router {
    let agent = Arc::new(research_agent(client, dir, config));
    let metrics = Arc::new(MetricsCollector::new().unwrap());

    agents_backend::create_app(
        Arc::new(ChatHandler::new(agent, metrics.clone())),
        Arc::new(HealthHandler::new(Environment::Development)),
        Arc::new(MetricsHandler::new(metrics)),
        &ServerSettings::default(),
        1024 * 1024,
    )
}

/// JSON payloads of every `data:` line in an SSE body
pub fn sse_payloads(body: &[u8]) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(body)
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| serde_json::from_str(data.trim()).unwrap())
        .collect()
}
