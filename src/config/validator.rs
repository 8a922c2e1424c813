use thiserror::Error;
use tracing::warn;

use crate::agents::config::{AgentConfig, LlmProviderConfig};
use crate::config::{LimitSettings, PromptSettings, ServerSettings, Settings};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Missing credential: environment variable {0} is not set")]
    MissingCredential(String),
}

pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(settings: &Settings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_server(&settings.server) {
            errors.extend(e);
        }

        if let Err(e) = Self::validate_logging(&settings.logging.level) {
            errors.extend(e);
        }

        if let Err(e) = Self::validate_limits(&settings.limits) {
            errors.extend(e);
        }

        if let Err(e) = Self::validate_prompts(&settings.prompts) {
            errors.extend(e);
        }

        if let Err(e) = Self::validate_llm(&settings.llm) {
            errors.extend(e);
        }

        if let Err(e) = Self::validate_agent(&settings.agent) {
            errors.extend(e);
        }

        if settings.environment.is_production() {
            Self::warn_production(settings);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_server(server: &ServerSettings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if server.host.is_empty() {
            errors.push(ValidationError::MissingField("server.host".to_string()));
        }

        if server.port == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "server.port".to_string(),
                reason: "Port must be greater than 0".to_string(),
            });
        }

        if server.cors_origins.is_empty() {
            errors.push(ValidationError::MissingField("server.cors_origins".to_string()));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_logging(level: &str) -> Result<(), Vec<ValidationError>> {
        if LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
            Ok(())
        } else {
            Err(vec![ValidationError::InvalidValue {
                field: "logging.level".to_string(),
                reason: format!("'{}' is not one of {}", level, LOG_LEVELS.join(", ")),
            }])
        }
    }

    fn validate_limits(limits: &LimitSettings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if limits.min_query_length == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "limits.min_query_length".to_string(),
                reason: "Must be at least 1".to_string(),
            });
        }

        if limits.max_query_length == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "limits.max_query_length".to_string(),
                reason: "Must be at least 1".to_string(),
            });
        }

        if limits.min_query_length > limits.max_query_length {
            errors.push(ValidationError::InvalidValue {
                field: "limits".to_string(),
                reason: format!(
                    "min_query_length ({}) exceeds max_query_length ({})",
                    limits.min_query_length, limits.max_query_length
                ),
            });
        }

        if limits.max_request_size == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "limits.max_request_size".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_prompts(prompts: &PromptSettings) -> Result<(), Vec<ValidationError>> {
        if prompts.dir.is_dir() {
            Ok(())
        } else {
            Err(vec![ValidationError::InvalidValue {
                field: "prompts.dir".to_string(),
                reason: format!("Directory {} does not exist", prompts.dir.display()),
            }])
        }
    }

    fn validate_llm(llm: &LlmProviderConfig) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if llm.model.is_empty() {
            errors.push(ValidationError::MissingField("llm.model".to_string()));
        }

        if llm.base_url.is_empty() {
            errors.push(ValidationError::MissingField("llm.base_url".to_string()));
        }

        if llm.api_key_env.is_empty() {
            errors.push(ValidationError::MissingField("llm.api_key_env".to_string()));
        } else {
            let present = std::env::var(&llm.api_key_env)
                .map(|key| !key.trim().is_empty())
                .unwrap_or(false);
            if !present {
                errors.push(ValidationError::MissingCredential(llm.api_key_env.clone()));
            }
        }

        if let Some(temperature) = llm.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                errors.push(ValidationError::InvalidValue {
                    field: "llm.temperature".to_string(),
                    reason: "Must be between 0.0 and 2.0".to_string(),
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_agent(agent: &AgentConfig) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if agent.name.is_empty() {
            errors.push(ValidationError::MissingField("agent.name".to_string()));
        }

        if agent.template.is_empty() {
            errors.push(ValidationError::MissingField("agent.template".to_string()));
        }

        let timeouts = [
            ("agent.render_timeout_secs", agent.render_timeout_secs),
            ("agent.llm_timeout_secs", agent.llm_timeout_secs),
            ("agent.fragment_timeout_secs", agent.fragment_timeout_secs),
        ];
        for (field, value) in timeouts {
            if value == 0 {
                errors.push(ValidationError::InvalidValue {
                    field: field.to_string(),
                    reason: "Timeout must be greater than 0".to_string(),
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Settings that are legal but unwise in production
    fn warn_production(settings: &Settings) {
        if settings.server.allows_any_origin() {
            warn!("CORS allows any origin in production; set server.cors_origins explicitly");
        }

        let level = settings.logging.level.to_ascii_lowercase();
        if level == "debug" || level == "trace" {
            warn!("Log level '{}' in production may be verbose", level);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const KEY_ENV: &str = "AGENTS_VALIDATOR_TEST_KEY";

    fn valid_settings(dir: &TempDir) -> Settings {
        std::env::set_var(KEY_ENV, "sk-test");
        let mut settings = Settings::default();
        settings.prompts.dir = dir.path().to_path_buf();
        settings.llm.api_key_env = KEY_ENV.to_string();
        settings
    }

    #[test]
    fn test_valid_config() {
        let dir = TempDir::new().unwrap();
        let settings = valid_settings(&dir);

        let result = ConfigValidator::validate(&settings);
        assert!(result.is_ok());
    }

    #[test]
    fn test_invalid_port() {
        let dir = TempDir::new().unwrap();
        let mut settings = valid_settings(&dir);
        settings.server.port = 0;

        let errors = ConfigValidator::validate(&settings).unwrap_err();
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_inverted_query_limits() {
        let dir = TempDir::new().unwrap();
        let mut settings = valid_settings(&dir);
        settings.limits.min_query_length = 100;
        settings.limits.max_query_length = 10;

        let errors = ConfigValidator::validate(&settings).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::InvalidValue { field, .. } if field == "limits")));
    }

    #[test]
    fn test_missing_credential() {
        let dir = TempDir::new().unwrap();
        let mut settings = valid_settings(&dir);
        settings.llm.api_key_env = "AGENTS_VALIDATOR_TEST_UNSET_KEY".to_string();

        let errors = ConfigValidator::validate(&settings).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::MissingCredential(_))));
    }

    #[test]
    fn test_collects_every_violation() {
        let dir = TempDir::new().unwrap();
        let mut settings = valid_settings(&dir);
        settings.prompts.dir = dir.path().join("missing");
        settings.logging.level = "loud".to_string();
        settings.agent.llm_timeout_secs = 0;
        settings.agent.template = String::new();

        let errors = ConfigValidator::validate(&settings).unwrap_err();
        assert_eq!(errors.len(), 4);
    }
}
