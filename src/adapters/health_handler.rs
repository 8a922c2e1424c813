use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

use crate::config::Environment;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub environment: String,
    pub version: String,
    pub uptime_seconds: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
    pub status: String,
    pub environment: String,
}

pub struct HealthHandler {
    environment: Environment,
    start_time: std::time::Instant,
}

impl HealthHandler {
    pub fn new(environment: Environment) -> Self {
        Self {
            environment,
            start_time: std::time::Instant::now(),
        }
    }

    /// Service banner
    pub async fn root(&self) -> impl IntoResponse {
        let info = ServiceInfo {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            status: "operational".to_string(),
            environment: self.environment.to_string(),
        };

        (StatusCode::OK, Json(info))
    }

    /// Basic health check - returns 200 if server is running
    pub async fn health(&self) -> impl IntoResponse {
        let status = HealthStatus {
            status: "healthy".to_string(),
            environment: self.environment.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        };

        (StatusCode::OK, Json(status))
    }
}
