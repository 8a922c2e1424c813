use agents_backend::agents::prompt::TemplateCachePolicy;
use agents_backend::cli::Cli;
use agents_backend::config::{Environment, Settings};
use serial_test::serial;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const KEY_ENV: &str = "AGENTS_CONFIG_TEST_API_KEY";

fn write_config(root: &Path, body: &str) -> std::path::PathBuf {
    fs::create_dir_all(root.join("prompts")).unwrap();
    let path = root.join("agents.toml");
    let toml = format!(
        "[prompts]\ndir = \"{}\"\n\n[llm]\napi_key_env = \"{}\"\n\n{}",
        root.join("prompts").display(),
        KEY_ENV,
        body
    );
    fs::write(&path, toml).unwrap();
    path
}

#[test]
#[serial]
fn test_file_overrides_defaults() -> anyhow::Result<()> {
    std::env::set_var(KEY_ENV, "sk-test");
    let temp_dir = TempDir::new()?;

    let path = write_config(
        temp_dir.path(),
        r#"
environment = "staging"

[server]
host = "0.0.0.0"
port = 9100
cors_origins = ["https://app.example.com"]

[limits]
max_query_length = 500

[agent]
template = "deep_research"
fragment_timeout_secs = 30
"#,
    );

    let settings = Settings::from_file(&path)?;

    assert_eq!(settings.environment, Environment::Staging);
    assert_eq!(settings.server.host, "0.0.0.0");
    assert_eq!(settings.server.port, 9100);
    assert_eq!(settings.server.cors_origins, vec!["https://app.example.com"]);
    assert_eq!(settings.limits.max_query_length, 500);
    assert_eq!(settings.agent.template, "deep_research");
    assert_eq!(settings.agent.fragment_timeout_secs, 30);

    // Untouched sections keep their defaults
    assert_eq!(settings.logging.level, "info");
    assert_eq!(settings.limits.min_query_length, 1);
    assert_eq!(settings.prompts.cache, TemplateCachePolicy::Watched);
    assert_eq!(settings.llm.model, "gpt-4o-mini");
    assert_eq!(settings.agent.llm_timeout_secs, 120);

    let agent = settings.agent_config();
    assert_eq!(agent.limits.max_length, 500);
    Ok(())
}

#[test]
#[serial]
fn test_cli_overrides_file() -> anyhow::Result<()> {
    std::env::set_var(KEY_ENV, "sk-test");
    let temp_dir = TempDir::new()?;
    let path = write_config(temp_dir.path(), "[server]\nport = 9200\n\n[logging]\nlevel = \"warn\"\n");

    let cli = Cli {
        config: path,
        host: Some("10.0.0.1".to_string()),
        port: Some(9300),
        log_level: Some("debug".to_string()),
    };
    let settings = Settings::new_with_cli(&cli)?;

    assert_eq!(settings.server.host, "10.0.0.1");
    assert_eq!(settings.server.port, 9300);
    assert_eq!(settings.logging.level, "debug");
    Ok(())
}

#[test]
#[serial]
fn test_env_overrides_file() -> anyhow::Result<()> {
    std::env::set_var(KEY_ENV, "sk-test");
    let temp_dir = TempDir::new()?;
    let path = write_config(temp_dir.path(), "[agent]\nname = \"file-research\"\n");

    std::env::set_var("AGENTS__AGENT__NAME", "env-research");
    let loaded = Settings::from_file(&path);
    std::env::remove_var("AGENTS__AGENT__NAME");
    let settings = loaded?;

    assert_eq!(settings.agent.name, "env-research");
    Ok(())
}

#[test]
#[serial]
fn test_cache_policy_parses() -> anyhow::Result<()> {
    std::env::set_var(KEY_ENV, "sk-test");
    let temp_dir = TempDir::new()?;
    let path = write_config(temp_dir.path(), "");
    let content = fs::read_to_string(&path)?.replace("[prompts]\n", "[prompts]\ncache = \"reload\"\n");
    fs::write(&path, content)?;

    let settings = Settings::from_file(&path)?;
    assert_eq!(settings.prompts.cache, TemplateCachePolicy::Reload);
    Ok(())
}

#[test]
#[serial]
fn test_rejects_inverted_limits() {
    std::env::set_var(KEY_ENV, "sk-test");
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(
        temp_dir.path(),
        "[limits]\nmin_query_length = 50\nmax_query_length = 10\n",
    );

    let err = Settings::from_file(&path).unwrap_err().to_string();
    assert!(err.contains("Configuration validation failed"));
    assert!(err.contains("min_query_length"));
}

#[test]
#[serial]
fn test_rejects_missing_api_key() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(temp_dir.path(), "");
    let content = fs::read_to_string(&path)
        .unwrap()
        .replace(KEY_ENV, "AGENTS_CONFIG_TEST_KEY_NEVER_SET");
    fs::write(&path, content).unwrap();

    let err = Settings::from_file(&path).unwrap_err().to_string();
    assert!(err.contains("AGENTS_CONFIG_TEST_KEY_NEVER_SET"));
}

#[test]
#[serial]
fn test_rejects_missing_prompts_dir() {
    std::env::set_var(KEY_ENV, "sk-test");
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(temp_dir.path(), "");
    fs::remove_dir(temp_dir.path().join("prompts")).unwrap();

    let err = Settings::from_file(&path).unwrap_err().to_string();
    assert!(err.contains("prompts.dir"));
}

#[test]
#[serial]
fn test_missing_required_file_fails() {
    let temp_dir = TempDir::new().unwrap();
    assert!(Settings::from_file(temp_dir.path().join("absent.toml")).is_err());
}
