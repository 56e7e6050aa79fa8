//! HTTP surface of the ensemble classifier

pub mod handlers;
pub mod upload;

use crate::config::AppConfig;
use crate::metrics::InferenceMetrics;
use crate::models::inference::InferenceEngine;
use crate::status::AvailabilityReporter;
use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Default request body limit when none is configured
const DEFAULT_BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<InferenceEngine>,
    pub reporter: AvailabilityReporter,
    pub metrics: Arc<InferenceMetrics>,
    pub upload_dir: PathBuf,
    pub body_limit: usize,
}

impl AppState {
    pub fn new(engine: Arc<InferenceEngine>, metrics: Arc<InferenceMetrics>, upload_dir: PathBuf) -> Self {
        let reporter = AvailabilityReporter::new(engine.registry().provider().clone());
        Self {
            engine,
            reporter,
            metrics,
            upload_dir,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    pub fn with_body_limit(mut self, body_limit: usize) -> Self {
        self.body_limit = body_limit;
        self
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let body_limit = state.body_limit;

    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/predict", post(handlers::predict_handler))
        .route("/models/status", get(handlers::models_status_handler))
        .route("/metrics", get(handlers::metrics_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Create the models and upload directories if they do not exist yet
pub fn prepare_directories(config: &AppConfig) -> Result<()> {
    for dir in [&config.models.models_dir, &config.server.upload_dir] {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    }
    Ok(())
}

/// Bind and serve until Ctrl-C
pub async fn serve(config: &AppConfig, state: AppState) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("API server listening on {}", addr);

    axum::serve(listener, router(state.with_body_limit(config.server.max_upload_bytes)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
