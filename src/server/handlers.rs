//! HTTP handlers for prediction, health and model status

use super::upload::{read_image_field, StagedImage, UploadError};
use super::AppState;
use crate::error::InferenceError;
use crate::metrics::MetricsSnapshot;
use crate::types::{EnsembleResult, Label, ModelId, ModelStatusReport};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Liveness acknowledgement
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

/// Successful `POST /predict` body
#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    pub success: bool,
    pub request_id: Uuid,
    pub prediction: Label,
    pub confidence: f64,
    pub details: BTreeMap<ModelId, Label>,
    pub all_predictions: Vec<Label>,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl PredictResponse {
    pub fn new(request_id: Uuid, result: &EnsembleResult) -> Self {
        Self {
            success: true,
            request_id,
            prediction: result.predicted_label(),
            confidence: result.confidence(),
            details: result.per_model_labels().clone(),
            all_predictions: result.all_labels().to_vec(),
            message: format!(
                "Predicted class: {} with {:.2}% confidence",
                result.predicted_label(),
                result.confidence() * 100.0
            ),
            timestamp: Utc::now(),
        }
    }
}

/// Structured failure body naming the stage that failed
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub stage: String,
    pub error: String,
}

/// Request failure mapped to a status code and an [`ErrorResponse`]
#[derive(Debug)]
pub enum ApiError {
    Upload(UploadError),
    Inference(InferenceError),
    Internal(String),
}

impl ApiError {
    pub fn stage(&self) -> &'static str {
        match self {
            ApiError::Upload(UploadError::Staging(_)) => "internal",
            ApiError::Upload(_) => "upload",
            ApiError::Inference(e) => e.stage(),
            ApiError::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Upload(UploadError::Staging(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Upload(_) => StatusCode::BAD_REQUEST,
            ApiError::Inference(InferenceError::Preprocessing(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::Inference(InferenceError::NoModelsAvailable) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Upload(e) => e.to_string(),
            ApiError::Inference(e) => format!("Inference failed: {}", e),
            ApiError::Internal(e) => format!("Server error: {}", e),
        }
    }
}

impl From<UploadError> for ApiError {
    fn from(e: UploadError) -> Self {
        ApiError::Upload(e)
    }
}

impl From<InferenceError> for ApiError {
    fn from(e: InferenceError) -> Self {
        ApiError::Inference(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            success: false,
            stage: self.stage().to_string(),
            error: self.message(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        message: "ML Backend is running".to_string(),
    })
}

/// GET /models/status
pub async fn models_status_handler(State(state): State<AppState>) -> Json<ModelStatusReport> {
    Json(state.reporter.report())
}

/// GET /metrics
pub async fn metrics_handler(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

/// POST /predict - classify the image in multipart field `image`
///
/// # Errors
/// - 400 Bad Request: missing file, empty filename, disallowed extension
/// - 422 Unprocessable Entity: the image could not be decoded
/// - 503 Service Unavailable: no model could produce a vote
/// - 500 Internal Server Error: staging or worker failure
pub async fn predict_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<PredictResponse>, ApiError> {
    let request_id = Uuid::new_v4();
    let start_time = Instant::now();

    match run_prediction(&state, request_id, &mut multipart).await {
        Ok(result) => {
            let processing_time = start_time.elapsed();
            state.metrics.record_prediction(processing_time, &result);

            info!(
                request_id = %request_id,
                label = result.predicted_label(),
                confidence = result.confidence(),
                models = result.model_count(),
                processing_time_us = processing_time.as_micros(),
                "Prediction served"
            );

            Ok(Json(PredictResponse::new(request_id, &result)))
        }
        Err(e) => {
            state.metrics.record_failure(e.stage());
            match e.status() {
                StatusCode::INTERNAL_SERVER_ERROR => {
                    error!(request_id = %request_id, error = %e.message(), "Prediction failed")
                }
                _ => warn!(request_id = %request_id, error = %e.message(), "Prediction rejected"),
            }
            Err(e)
        }
    }
}

async fn run_prediction(
    state: &AppState,
    request_id: Uuid,
    multipart: &mut Multipart,
) -> Result<EnsembleResult, ApiError> {
    let upload = read_image_field(multipart).await?;
    let staged = StagedImage::stage(&state.upload_dir, request_id, &upload)?;

    let engine = state.engine.clone();
    // `staged` moves into the task and is dropped (file removed) when it ends
    let outcome = tokio::task::spawn_blocking(move || engine.classify_path(staged.path()))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(outcome?)
}
