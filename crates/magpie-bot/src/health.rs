//! Health check and metrics endpoint.

use std::sync::Arc;
use std::time::SystemTime;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub uptime_seconds: u64,
    pub bot_username: Option<String>,
}

/// Update counters since startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metrics {
    pub messages_received: u64,
    pub callbacks_received: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub metrics: Arc<RwLock<Metrics>>,
    pub start_time: SystemTime,
    pub bot_username: Option<String>,
}

impl AppState {
    pub fn new(bot_username: Option<String>) -> Self {
        Self {
            metrics: Arc::new(RwLock::new(Metrics::default())),
            start_time: SystemTime::now(),
            bot_username,
        }
    }

    pub async fn increment_messages_received(&self) {
        self.metrics.write().await.messages_received += 1;
    }

    pub async fn increment_callbacks_received(&self) {
        self.metrics.write().await.callbacks_received += 1;
    }
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthStatus> {
    let uptime = state.start_time.elapsed().unwrap_or_default().as_secs();

    Json(HealthStatus {
        status: "healthy".to_string(),
        uptime_seconds: uptime,
        bot_username: state.bot_username.clone(),
    })
}

async fn metrics_handler(State(state): State<AppState>) -> Json<Metrics> {
    let metrics = state.metrics.read().await;
    Json(metrics.clone())
}

/// Liveness check (process is alive).
async fn live_handler() -> StatusCode {
    StatusCode::OK
}

pub fn create_health_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/live", get(live_handler))
        .with_state(state)
}

/// Start health check server.
pub async fn start_health_server(state: AppState, port: u16) -> anyhow::Result<()> {
    let app = create_health_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Health check server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
