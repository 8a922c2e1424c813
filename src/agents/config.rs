//! Configuration types for agents and their LLM client

use serde::{Deserialize, Serialize};

/// Configuration for an agent
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AgentConfig {
    /// Agent name (used in logs and responses)
    #[serde(default = "default_agent_name")]
    pub name: String,
    /// Identifier of the prompt template this agent renders
    #[serde(default = "default_template")]
    pub template: String,
    /// Upper bound on loading and rendering the prompt
    #[serde(default = "default_render_timeout")]
    pub render_timeout_secs: u64,
    /// Upper bound on a whole non-streaming completion
    #[serde(default = "default_llm_timeout")]
    pub llm_timeout_secs: u64,
    /// Upper bound on the wait for each streamed fragment
    #[serde(default = "default_fragment_timeout")]
    pub fragment_timeout_secs: u64,
    /// Temperature override (if not set, uses LLM config default)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Max tokens override (if not set, uses LLM config default)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Query length bounds, filled from `[limits]`
    #[serde(skip)]
    pub limits: QueryLimits,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            template: default_template(),
            render_timeout_secs: default_render_timeout(),
            llm_timeout_secs: default_llm_timeout(),
            fragment_timeout_secs: default_fragment_timeout(),
            temperature: None,
            max_tokens: None,
            limits: QueryLimits::default(),
        }
    }
}

fn default_agent_name() -> String {
    "research".to_string()
}

fn default_template() -> String {
    "research".to_string()
}

fn default_render_timeout() -> u64 {
    5
}

fn default_llm_timeout() -> u64 {
    120
}

fn default_fragment_timeout() -> u64 {
    60
}

/// Accepted query length range, in characters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct QueryLimits {
    pub min_length: usize,
    pub max_length: usize,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            min_length: 1,
            max_length: 10_000,
        }
    }
}

/// LLM client configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmProviderConfig {
    /// Model name/identifier
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable containing the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Base URL of an OpenAI-compatible API
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Default temperature for completions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Default max tokens for completions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Connect timeout for the HTTP client
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for LlmProviderConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            temperature: None,
            max_tokens: None,
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}
