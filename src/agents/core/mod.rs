//! Core agent implementations
//!
//! An agent turns a caller's query into an answer by rendering a prompt
//! template and delegating to an injected [`LlmClient`]. The only variant
//! today is [`ResearchAgent`]: one rendered prompt, one provider call.
//!
//! [`LlmClient`]: crate::agents::llm::LlmClient

mod research;

pub use research::ResearchAgent;

use async_trait::async_trait;

use crate::agents::domain::{AgentAnswer, AnswerStream};
use crate::agents::error::AgentResult;

/// Trait for executable agents
///
/// Implementations are stateless between calls and shared behind
/// `Arc<dyn Agent>`.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Get the agent's name
    fn name(&self) -> &str;

    /// Model used for completions
    fn model(&self) -> &str;

    /// Answer a query in one piece
    async fn answer(&self, query: &str) -> AgentResult<AgentAnswer>;

    /// Answer a query as a stream of text fragments.
    ///
    /// Validation and prompt failures are returned from this call; provider
    /// failures arrive as stream items.
    async fn answer_stream(&self, query: &str) -> AgentResult<AnswerStream>;
}
