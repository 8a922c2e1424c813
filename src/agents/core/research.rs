//! Research agent: one rendered prompt, one provider call

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::Instrument;

use super::Agent;
use crate::agents::config::AgentConfig;
use crate::agents::domain::{AgentAnswer, AnswerStream, Query};
use crate::agents::error::{AgentError, AgentResult};
use crate::agents::llm::{CompletionRequest, LlmClient};
use crate::agents::prompt::{RenderedPrompt, TemplateStore};

/// Answers research questions through the configured prompt template
pub struct ResearchAgent {
    config: AgentConfig,
    llm: Arc<dyn LlmClient>,
    templates: Arc<TemplateStore>,
}

impl ResearchAgent {
    /// Create a new research agent around a shared client and template store
    pub fn new(config: AgentConfig, llm: Arc<dyn LlmClient>, templates: Arc<TemplateStore>) -> Self {
        Self {
            config,
            llm,
            templates,
        }
    }

    /// Validate the query and render the prompt, bounded by the render timeout
    async fn prepare(&self, raw: &str) -> AgentResult<(Query, CompletionRequest)> {
        let query = Query::parse(raw, self.config.limits)?;

        let secs = self.config.render_timeout_secs;
        let rendered = tokio::time::timeout(
            Duration::from_secs(secs),
            self.templates.render(&self.config.template, query.as_str()),
        )
        .await
        .map_err(|_| AgentError::Timeout(secs))??;

        let request = self.build_request(rendered);
        Ok((query, request))
    }

    fn build_request(&self, rendered: RenderedPrompt) -> CompletionRequest {
        CompletionRequest {
            messages: rendered.into_messages(),
            model: Some(self.llm.model().to_string()),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            stream: false,
        }
    }

    fn span(&self, mode: &'static str, raw: &str) -> tracing::Span {
        tracing::info_span!(
            "research_agent",
            agent = %self.config.name,
            template = %self.config.template,
            mode,
            query_len = raw.chars().count()
        )
    }

    async fn complete(&self, raw: &str) -> AgentResult<AgentAnswer> {
        let start_time = Instant::now();
        let (query, request) = self.prepare(raw).await?;
        tracing::info!(
            query = %query.preview(),
            query_chars = query.char_count(),
            "Answering query"
        );

        let secs = self.config.llm_timeout_secs;
        let response = tokio::time::timeout(Duration::from_secs(secs), self.llm.complete(request))
            .await
            .map_err(|_| {
                tracing::warn!(timeout_secs = secs, "LLM completion timed out");
                AgentError::Timeout(secs)
            })??;

        let execution_time_ms = start_time.elapsed().as_millis() as u64;
        tracing::info!(
            execution_time_ms,
            answer_len = response.message.content.len(),
            "Answer complete"
        );

        Ok(AgentAnswer {
            content: response.message.content,
            model: self.llm.model().to_string(),
            usage: response.usage,
            execution_time_ms,
        })
    }

    async fn stream(&self, raw: &str) -> AgentResult<AnswerStream> {
        let (query, mut request) = self.prepare(raw).await?;
        tracing::info!(
            query = %query.preview(),
            query_chars = query.char_count(),
            "Streaming answer"
        );

        request.stream = true;
        let inner = self.llm.complete_stream(request);
        Ok(AnswerStream::new(
            inner,
            Duration::from_secs(self.config.fragment_timeout_secs),
        ))
    }
}

#[async_trait]
impl Agent for ResearchAgent {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn model(&self) -> &str {
        self.llm.model()
    }

    async fn answer(&self, raw: &str) -> AgentResult<AgentAnswer> {
        let span = self.span("complete", raw);
        self.complete(raw).instrument(span).await
    }

    async fn answer_stream(&self, raw: &str) -> AgentResult<AnswerStream> {
        let span = self.span("stream", raw);
        self.stream(raw).instrument(span).await
    }
}
