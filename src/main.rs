use agents_backend::adapters::chat_handler::ChatHandler;
use agents_backend::adapters::health_handler::HealthHandler;
use agents_backend::adapters::metrics_handler::{MetricsCollector, MetricsHandler};
use agents_backend::agents::core::ResearchAgent;
use agents_backend::agents::llm::create_client;
use agents_backend::agents::prompt::TemplateStore;
use agents_backend::cli::Cli;
use agents_backend::config::Settings;
use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let settings = Settings::load_with_cli(&cli)?;

    // Initialize tracing; RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Validated after tracing is up so production warnings are visible
    settings.validate()?;

    let host = settings.server.host.clone();
    let port = settings.server.port;
    info!(
        environment = %settings.environment,
        "Starting agents backend on {}:{}", host, port
    );

    // One client for the whole process
    let llm = create_client(&settings.llm)
        .with_context(|| format!("Failed to create LLM client for model {}", settings.llm.model))?;
    info!(provider = llm.name(), model = llm.model(), "LLM client ready");

    // Fail fast if the agent's template cannot be loaded
    let templates = Arc::new(TemplateStore::new(
        settings.prompts.dir.clone(),
        settings.prompts.cache,
    ));
    templates
        .get(&settings.agent.template)
        .await
        .with_context(|| format!("Failed to load prompt template '{}'", settings.agent.template))?;
    info!(
        templates = ?templates.names()?,
        cache = ?settings.prompts.cache,
        "Prompt templates loaded"
    );
    let _watcher = templates.watch()?;

    let agent = Arc::new(ResearchAgent::new(
        settings.agent_config(),
        llm,
        templates.clone(),
    ));

    // Initialize handlers
    let metrics = Arc::new(MetricsCollector::new()?);
    let chat_handler = Arc::new(ChatHandler::new(agent, metrics.clone()));
    let health_handler = Arc::new(HealthHandler::new(settings.environment));
    let metrics_handler = Arc::new(MetricsHandler::new(metrics));

    // Create application using the library function
    let app = agents_backend::create_app(
        chat_handler,
        health_handler,
        metrics_handler,
        &settings.server,
        settings.limits.max_request_size,
    );

    // Start server
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}
