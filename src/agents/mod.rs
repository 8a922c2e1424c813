//! Research agent pipeline
//!
//! ## Architecture
//!
//! - `domain/` - Core types (Query, Message, AnswerStream)
//! - `prompt/` - Prompt template store and rendering
//! - `llm/` - LLM client capability with streaming
//! - `core/` - Agent contract and the research agent

pub mod config;
pub mod core;
pub mod domain;
pub mod error;
pub mod llm;
pub mod prompt;

// Re-export commonly used types
pub use self::config::*;
pub use self::core::{Agent, ResearchAgent};
pub use domain::*;
pub use error::*;
pub use llm::{create_client, LlmClient};
pub use prompt::{TemplateCachePolicy, TemplateStore};
