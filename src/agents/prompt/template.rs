//! Prompt template definitions and rendering

use serde::{Deserialize, Serialize};
use tera::{Context, Tera};

use crate::agents::domain::Message;
use crate::agents::error::{AgentError, AgentResult};

/// Name of the template variable the query is bound to
pub const QUERY_VARIABLE: &str = "query";

/// A stored prompt template
///
/// ```yaml
/// name: research
/// description: Single-pass research answer
/// system: You are a careful research assistant.
/// template: |
///   Research the following question and answer concisely.
///   Question: {{ query }}
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PromptTemplate {
    /// Template identifier; defaults to the file stem
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Optional system message (may also reference `{{ query }}`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// User message body, rendered with Tera
    pub template: String,
}

/// A template with the query substituted in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPrompt {
    pub template_id: String,
    pub system: Option<String>,
    pub user: String,
}

impl RenderedPrompt {
    /// Messages for a completion request
    pub fn into_messages(self) -> Vec<Message> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = self.system {
            messages.push(Message::system(system));
        }
        messages.push(Message::user(self.user));
        messages
    }
}

impl PromptTemplate {
    /// Substitute the query into the template.
    ///
    /// Autoescaping is off so the query appears verbatim. Referencing any
    /// variable other than `query` is a render error.
    pub fn render(&self, query: &str) -> AgentResult<RenderedPrompt> {
        let mut context = Context::new();
        context.insert(QUERY_VARIABLE, query);

        let user = render_body(&self.name, &self.template, &context)?;
        let system = match &self.system {
            Some(system) => Some(render_body(&self.name, system, &context)?),
            None => None,
        };

        Ok(RenderedPrompt {
            template_id: self.name.clone(),
            system,
            user,
        })
    }
}

fn render_body(name: &str, body: &str, context: &Context) -> AgentResult<String> {
    Tera::one_off(body, context, false).map_err(|e| {
        AgentError::TemplateRender(format!("template '{}': {}", name, error_chain(&e)))
    })
}

/// Tera nests the useful message in its source chain
fn error_chain(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}
