//! Single-pass answer stream

use futures::{Stream, StreamExt};
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::{Instant, Sleep};

use super::TokenUsage;
use crate::agents::error::{AgentError, AgentResult};
use crate::agents::llm::LlmStream;

/// Lifecycle of an [`AnswerStream`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamState {
    /// Fragments may still arrive
    Open,
    /// Provider signalled completion; every fragment was delivered
    Completed,
    /// Provider failed or a fragment deadline passed
    Failed,
    /// Consumer stopped reading before the end
    Cancelled,
}

impl StreamState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamState::Open)
    }
}

/// Streamed answer text, yielded fragment by fragment in provider order.
///
/// The stream is finite and cannot be restarted. Once it has yielded its
/// terminal item (`None` on completion, or the error that failed it), every
/// further poll yields [`AgentError::ExhaustedStream`] without touching the
/// provider. Dropping it, or calling [`AnswerStream::cancel`], closes the
/// channel so the provider task abandons the upstream call.
pub struct AnswerStream {
    inner: LlmStream,
    state: StreamState,
    fragment_timeout: Duration,
    deadline: Pin<Box<Sleep>>,
    waiting: bool,
    fragments: usize,
    usage: Option<TokenUsage>,
}

impl AnswerStream {
    /// Wrap a provider stream, bounding the wait for each fragment
    pub fn new(inner: LlmStream, fragment_timeout: Duration) -> Self {
        Self {
            inner,
            state: StreamState::Open,
            fragment_timeout,
            deadline: Box::pin(tokio::time::sleep(fragment_timeout)),
            waiting: false,
            fragments: 0,
            usage: None,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Number of non-empty fragments delivered so far
    pub fn fragments_yielded(&self) -> usize {
        self.fragments
    }

    /// Usage reported by the provider, once it has been seen
    pub fn usage(&self) -> Option<TokenUsage> {
        self.usage
    }

    /// Stop reading and release the provider call
    pub fn cancel(&mut self) {
        if self.state == StreamState::Open {
            self.inner.close();
            self.state = StreamState::Cancelled;
        }
    }

    /// Drain the remaining fragments into one string
    pub async fn collect_text(&mut self) -> AgentResult<String> {
        if self.state.is_terminal() {
            return Err(AgentError::ExhaustedStream);
        }

        let mut text = String::new();
        while let Some(fragment) = self.next().await {
            text.push_str(&fragment?);
        }
        Ok(text)
    }

    fn fail(&mut self, error: AgentError) -> Poll<Option<AgentResult<String>>> {
        self.inner.close();
        self.state = StreamState::Failed;
        Poll::Ready(Some(Err(error)))
    }
}

impl Stream for AnswerStream {
    type Item = AgentResult<String>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;

        if this.state.is_terminal() {
            return Poll::Ready(Some(Err(AgentError::ExhaustedStream)));
        }

        loop {
            match Pin::new(&mut this.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(chunk))) => {
                    this.waiting = false;

                    if chunk.usage.is_some() {
                        this.usage = chunk.usage;
                    }
                    // Role-only and usage-only chunks carry no text
                    if !chunk.has_content() {
                        continue;
                    }

                    this.fragments += 1;
                    return Poll::Ready(Some(Ok(chunk.content)));
                }
                Poll::Ready(Some(Err(e))) => return this.fail(AgentError::Llm(e)),
                Poll::Ready(None) => {
                    this.state = StreamState::Completed;
                    return Poll::Ready(None);
                }
                Poll::Pending => {
                    // The deadline counts from when the wait began, not from
                    // the previous fragment
                    if !this.waiting {
                        this.waiting = true;
                        let deadline = Instant::now() + this.fragment_timeout;
                        this.deadline.as_mut().reset(deadline);
                    }
                    if this.deadline.as_mut().poll(cx).is_ready() {
                        let secs = this.fragment_timeout.as_secs();
                        return this.fail(AgentError::Timeout(secs));
                    }
                    return Poll::Pending;
                }
            }
        }
    }
}

impl Drop for AnswerStream {
    fn drop(&mut self) {
        if self.state == StreamState::Open {
            tracing::debug!(
                fragments = self.fragments,
                "Answer stream dropped before completion, cancelling provider call"
            );
        }
    }
}
