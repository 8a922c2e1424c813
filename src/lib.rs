//! # Agents Backend
//!
//! An HTTP service that answers natural-language research questions by
//! rendering a prompt template and delegating to an LLM, either as a
//! whole JSON answer or as a Server-Sent Events stream of fragments.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use agents_backend::config::Settings;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Load configuration
//!     let settings = Settings::new()?;
//!
//!     // Server will start on configured host:port
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **Agents**: query validation, prompt templates, LLM client, agents
//! - **Adapters**: HTTP handlers, error translation, metrics
//! - **Config**: layered settings with fail-fast validation

pub mod adapters;
pub mod agents;
pub mod cli;
pub mod config;

use crate::adapters::chat_handler::{ChatHandler, ChatRequest};
use crate::adapters::health_handler::HealthHandler;
use crate::adapters::metrics_handler::MetricsHandler;
use crate::config::ServerSettings;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Creates the Axum application router with all endpoints configured.
///
/// # Arguments
///
/// * `chat_handler` - Research chat handler wrapping the shared agent
/// * `health_handler` - Health check handler
/// * `metrics_handler` - Metrics collection handler
/// * `server` - Server settings (CORS origins)
/// * `max_request_size` - Request body limit in bytes
///
/// # Returns
///
/// Configured Axum Router
pub fn create_app(
    chat_handler: Arc<ChatHandler>,
    health_handler: Arc<HealthHandler>,
    metrics_handler: Arc<MetricsHandler>,
    server: &ServerSettings,
    max_request_size: usize,
) -> Router {
    let chat_router = Router::new()
        .route("/chat/research", post({
            let handler = chat_handler.clone();
            move |Json(request): Json<ChatRequest>| {
                let h = handler.clone();
                async move { h.research(request).await }
            }
        }))
        .route("/chat/research/stream", post({
            let handler = chat_handler.clone();
            move |Json(request): Json<ChatRequest>| {
                let h = handler.clone();
                async move { h.research_stream(request).await }
            }
        }));

    Router::new()
        .route("/", get({
            let handler = health_handler.clone();
            move || {
                let h = handler.clone();
                async move { h.root().await }
            }
        }))
        .route("/health", get({
            let handler = health_handler.clone();
            move || {
                let h = handler.clone();
                async move { h.health().await }
            }
        }))
        .route("/metrics", get({
            let handler = metrics_handler.clone();
            move || {
                let h = handler.clone();
                async move { h.metrics().await }
            }
        }))
        .nest("/api/v1", chat_router)
        .layer(DefaultBodyLimit::max(max_request_size))
        .layer(cors_layer(server))
        .layer(TraceLayer::new_for_http())
}

/// CORS from the configured origins; `"*"` allows any origin without
/// credentials
fn cors_layer(server: &ServerSettings) -> CorsLayer {
    if server.allows_any_origin() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = server
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .allow_credentials(true)
}
