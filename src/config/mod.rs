use config::{Config, Environment as EnvSource, File};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

pub mod validator;

use crate::agents::config::{AgentConfig, LlmProviderConfig, QueryLimits};
use crate::agents::prompt::TemplateCachePolicy;
use crate::cli::Cli;

/// Prefix for environment overrides, e.g. `AGENTS__SERVER__PORT=9000`
pub const ENV_PREFIX: &str = "AGENTS";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub limits: LimitSettings,
    #[serde(default)]
    pub prompts: PromptSettings,
    #[serde(default)]
    pub llm: LlmProviderConfig,
    #[serde(default)]
    pub agent: AgentConfig,
}

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allowed CORS origins; `"*"` allows any origin
    #[serde(
        default = "default_cors_origins",
        deserialize_with = "deserialize_origins"
    )]
    pub cors_origins: Vec<String>,
}

impl ServerSettings {
    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.iter().any(|o| o == "*")
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://localhost:8000".to_string(),
    ]
}

/// Accept either a list of origins or a single string (`"*"` included)
fn deserialize_origins<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Origins {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Origins::deserialize(deserializer)? {
        Origins::One(origin) => origin
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Origins::Many(origins) => origins,
    })
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LimitSettings {
    #[serde(default = "default_min_query_length")]
    pub min_query_length: usize,
    #[serde(default = "default_max_query_length")]
    pub max_query_length: usize,
    /// Maximum request body size in bytes
    #[serde(default = "default_max_request_size")]
    pub max_request_size: usize,
}

impl LimitSettings {
    pub fn query_limits(&self) -> QueryLimits {
        QueryLimits {
            min_length: self.min_query_length,
            max_length: self.max_query_length,
        }
    }
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            min_query_length: default_min_query_length(),
            max_query_length: default_max_query_length(),
            max_request_size: default_max_request_size(),
        }
    }
}

fn default_min_query_length() -> usize {
    1
}

fn default_max_query_length() -> usize {
    10_000
}

fn default_max_request_size() -> usize {
    10 * 1024 * 1024
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PromptSettings {
    #[serde(default = "default_prompts_dir")]
    pub dir: PathBuf,
    #[serde(default)]
    pub cache: TemplateCachePolicy,
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self {
            dir: default_prompts_dir(),
            cache: TemplateCachePolicy::default(),
        }
    }
}

fn default_prompts_dir() -> PathBuf {
    PathBuf::from("config/prompts")
}

impl Settings {
    pub fn new() -> Result<Self, anyhow::Error> {
        Self::new_with_cli(&Cli {
            config: PathBuf::from("agents.toml"),
            ..Default::default()
        })
    }

    /// Create settings from CLI arguments (includes config file and CLI overrides)
    pub fn new_with_cli(cli: &Cli) -> Result<Self, anyhow::Error> {
        let settings = Self::load_with_cli(cli)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Layered settings with CLI overrides applied, not yet validated
    pub fn load_with_cli(cli: &Cli) -> Result<Self, anyhow::Error> {
        let mut settings = Self::load(&cli.config, false)?;

        // CLI > env vars > config file > defaults
        settings.apply_cli_overrides(cli);
        Ok(settings)
    }

    /// Load and validate settings from a file that must exist
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let settings = Self::load(path.as_ref(), true)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Layer the config file and `AGENTS__*` environment variables over the
    /// built-in defaults, without validating
    pub fn load(path: &Path, required: bool) -> Result<Self, anyhow::Error> {
        let s = Config::builder()
            .add_source(File::from(path.to_path_buf()).required(required))
            .add_source(
                EnvSource::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = s.try_deserialize()?;
        Ok(settings)
    }

    /// Apply CLI argument overrides to settings
    fn apply_cli_overrides(&mut self, cli: &Cli) {
        if let Some(host) = &cli.host {
            self.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            self.server.port = port;
        }
        if let Some(level) = &cli.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Run every configuration check, reporting all violations at once
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        validator::ConfigValidator::validate(self).map_err(|errors| {
            let error_messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            anyhow::anyhow!(
                "Configuration validation failed:\n{}",
                error_messages.join("\n")
            )
        })
    }

    /// Agent configuration with the query limits filled in
    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig {
            limits: self.limits.query_limits(),
            ..self.agent.clone()
        }
    }
}
