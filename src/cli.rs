use clap::Parser;
use std::path::PathBuf;

/// Research agent API server
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "agents-backend", version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "AGENTS_CONFIG", default_value = "agents.toml")]
    pub config: PathBuf,

    /// Server host address
    #[arg(long, env = "AGENTS_HOST")]
    pub host: Option<String>,

    /// Server port
    #[arg(long, env = "AGENTS_PORT")]
    pub port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "AGENTS_LOG_LEVEL")]
    pub log_level: Option<String>,
}
