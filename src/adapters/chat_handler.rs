//! Chat endpoints: whole answers as JSON, streamed answers as SSE

use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::adapters::api_error::ApiError;
use crate::adapters::metrics_handler::{InFlightGuard, MetricsCollector};
use crate::agents::core::Agent;
use crate::agents::domain::{preview, AnswerStream, TokenUsage};
use crate::agents::error::AgentError;

const MODE_COMPLETE: &str = "complete";
const MODE_STREAM: &str = "stream";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatRequest {
    pub query: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResearchResponse {
    pub answer: String,
    pub agent: String,
    pub model: String,
    pub execution_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

pub struct ChatHandler {
    agent: Arc<dyn Agent>,
    metrics: Arc<MetricsCollector>,
}

impl ChatHandler {
    pub fn new(agent: Arc<dyn Agent>, metrics: Arc<MetricsCollector>) -> Self {
        Self { agent, metrics }
    }

    /// `POST /api/v1/chat/research`
    pub async fn research(&self, request: ChatRequest) -> Result<Json<ResearchResponse>, ApiError> {
        let request_id = Uuid::new_v4().to_string();
        let _in_flight = self.metrics.in_flight();
        info!(
            request_id = %request_id,
            query = %preview(&request.query),
            query_len = request.query.chars().count(),
            "Research request"
        );

        let started = Instant::now();
        let answer = self
            .agent
            .answer(&request.query)
            .await
            .map_err(|e| self.translate(MODE_COMPLETE, e, &request_id))?;

        self.metrics
            .llm_duration
            .with_label_values(&[MODE_COMPLETE])
            .observe(started.elapsed().as_secs_f64());
        self.metrics.record_request(MODE_COMPLETE, "ok");
        info!(
            request_id = %request_id,
            execution_time_ms = answer.execution_time_ms,
            "Research request complete"
        );

        Ok(Json(ResearchResponse {
            answer: answer.content,
            agent: self.agent.name().to_string(),
            model: answer.model,
            execution_time_ms: answer.execution_time_ms,
            usage: answer.usage,
        }))
    }

    /// `POST /api/v1/chat/research/stream`
    ///
    /// Failures before the first fragment are returned as plain HTTP
    /// errors. Once streaming has begun, a failure is sent as a final
    /// `error` event.
    pub async fn research_stream(
        &self,
        request: ChatRequest,
    ) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
        let request_id = Uuid::new_v4().to_string();
        let in_flight = self.metrics.in_flight();
        info!(
            request_id = %request_id,
            query = %preview(&request.query),
            query_len = request.query.chars().count(),
            "Research stream request"
        );

        let answer = self
            .agent
            .answer_stream(&request.query)
            .await
            .map_err(|e| self.translate(MODE_STREAM, e, &request_id))?;

        let session = StreamSession {
            answer,
            metrics: self.metrics.clone(),
            request_id,
            started: Instant::now(),
            finished: false,
            _in_flight: in_flight,
        };

        let events = stream::unfold(Some(session), |session| async move {
            let mut session = match session {
                Some(session) => session,
                None => return None,
            };

            match session.answer.next().await {
                Some(Ok(fragment)) => {
                    session.metrics.stream_fragments.inc();
                    let payload = json!({ "type": "token", "content": fragment });
                    Some((Ok(Event::default().data(payload.to_string())), Some(session)))
                }
                Some(Err(err)) => {
                    let event = session.fail(err);
                    Some((Ok(event), None))
                }
                None => {
                    let event = session.complete();
                    Some((Ok(event), None))
                }
            }
        });

        Ok(Sse::new(events).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
    }

    /// Log the full error, count it, and reduce it to what callers may see
    fn translate(&self, mode: &str, err: AgentError, request_id: &str) -> ApiError {
        self.metrics.record_request(mode, err.kind());
        log_failure(mode, &err, request_id);
        ApiError::from(err).with_request_id(request_id)
    }
}

fn log_failure(mode: &str, err: &AgentError, request_id: &str) {
    match err {
        AgentError::Validation(_) => {
            warn!(request_id, mode, kind = err.kind(), "Rejected query: {}", err)
        }
        _ => error!(request_id, mode, kind = err.kind(), "Request failed: {}", err),
    }
}

/// One SSE response; dropping it (client disconnect) drops the answer
/// stream and so cancels the provider call
struct StreamSession {
    answer: AnswerStream,
    metrics: Arc<MetricsCollector>,
    request_id: String,
    started: Instant,
    finished: bool,
    _in_flight: InFlightGuard,
}

impl StreamSession {
    fn complete(&mut self) -> Event {
        self.finished = true;
        let fragments = self.answer.fragments_yielded();
        self.metrics
            .llm_duration
            .with_label_values(&[MODE_STREAM])
            .observe(self.started.elapsed().as_secs_f64());
        self.metrics.record_request(MODE_STREAM, "ok");
        info!(request_id = %self.request_id, fragments, "Research stream complete");

        let payload = json!({ "type": "done", "fragments": fragments });
        Event::default().data(payload.to_string())
    }

    fn fail(&mut self, err: AgentError) -> Event {
        self.finished = true;
        self.metrics.record_request(MODE_STREAM, err.kind());
        log_failure(MODE_STREAM, &err, &self.request_id);

        let api = ApiError::from(err);
        let payload = json!({ "type": "error", "error": api.code(), "message": api.detail() });
        Event::default().data(payload.to_string())
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        if !self.finished {
            self.metrics.record_request(MODE_STREAM, "cancelled");
            info!(
                request_id = %self.request_id,
                fragments = self.answer.fragments_yielded(),
                "Client disconnected before the stream finished"
            );
        }
    }
}
