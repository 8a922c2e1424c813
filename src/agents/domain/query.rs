//! Validated user query

use crate::agents::config::QueryLimits;
use crate::agents::error::{AgentError, AgentResult};

/// Number of characters kept by [`Query::preview`]
const PREVIEW_CHARS: usize = 100;

/// A query that has passed length validation.
///
/// Surrounding whitespace is trimmed before the bounds are checked, so a
/// query made only of whitespace is rejected as empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query(String);

impl Query {
    /// Validate raw caller input against the configured bounds
    pub fn parse(raw: &str, limits: QueryLimits) -> AgentResult<Self> {
        let trimmed = raw.trim();
        let length = trimmed.chars().count();

        if length == 0 {
            return Err(AgentError::Validation("Query must not be empty".to_string()));
        }

        if length < limits.min_length || length > limits.max_length {
            return Err(AgentError::Validation(format!(
                "Query must be between {} and {} characters (got {})",
                limits.min_length, limits.max_length, length
            )));
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length in characters
    pub fn char_count(&self) -> usize {
        self.0.chars().count()
    }

    /// Short form for log lines
    pub fn preview(&self) -> String {
        preview(&self.0)
    }
}

impl AsRef<str> for Query {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Truncate text to a log-friendly preview on a char boundary
pub fn preview(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
