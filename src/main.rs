//! Ensemble Image Classifier - Main Entry Point
//!
//! Serves majority-vote predictions over five ONNX classifiers via HTTP.

use anyhow::Result;
use ensemble_classifier::{
    config::{AppConfig, LoggingConfig},
    metrics::{InferenceMetrics, MetricsReporter},
    models::inference::InferenceEngine,
    server::{self, AppState},
};
use std::sync::Arc;
use tracing::{info, warn};

fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().or_else(|_| {
        tracing_subscriber::EnvFilter::try_new(format!("ensemble_classifier={}", config.level))
    })?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;

    // Initialize logging
    init_logging(&config.logging)?;

    info!("Starting Ensemble Classifier Server");
    info!("Models directory: {}", config.models.models_dir.display());
    info!("Upload directory: {}", config.server.upload_dir.display());

    server::prepare_directories(&config)?;

    // Initialize metrics
    let metrics = Arc::new(InferenceMetrics::new());

    // Initialize inference engine with ONNX models
    let engine = Arc::new(InferenceEngine::new(&config).with_metrics(metrics.clone()));

    let state = AppState::new(engine, metrics.clone(), config.server.upload_dir.clone());

    // Check model availability
    let report = state.reporter.report();
    info!(
        "Available models: {}/{}",
        report.available_count, report.total_count
    );
    if !report.missing.is_empty() {
        warn!(missing = ?report.missing, "Some models are missing");
    }

    // Start metrics reporter
    if config.metrics.report_interval_secs > 0 {
        let reporter = MetricsReporter::new(metrics.clone(), config.metrics.report_interval_secs);
        tokio::spawn(reporter.start());
    }

    server::serve(&config, state).await?;

    info!("Server shutting down...");
    metrics.print_summary();

    Ok(())
}
