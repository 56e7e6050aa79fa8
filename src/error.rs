//! Error types for the inference pipeline
//!
//! Only [`InferenceError`] ever reaches a caller. Load and predict failures
//! are scoped to a single model slot and absorbed by the registry and the
//! inference engine.

use crate::types::ModelId;
use std::path::PathBuf;
use thiserror::Error;

/// The input image could not be turned into a feature vector
#[derive(Debug, Error)]
pub enum PreprocessingError {
    #[error("Image data is empty")]
    EmptyData,

    #[error("Failed to read image {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode image: {0}")]
    DecodeFailed(#[from] image::ImageError),

    #[error("Image contains no pixel data")]
    NoPixels,

    #[error("Feature value {value} at index {index} is outside [0, 1]")]
    OutOfRange { index: usize, value: f32 },
}

/// A persisted model exists but could not be loaded
#[derive(Debug, Error)]
#[error("Failed to load model {model} from {path}: {reason}")]
pub struct ModelLoadError {
    pub model: ModelId,
    pub path: PathBuf,
    pub reason: String,
}

/// A loaded model failed while scoring a feature vector
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("Failed to build input tensor: {0}")]
    Input(String),

    #[error("Model runtime error: {0}")]
    Runtime(String),

    #[error("Model produced no label output")]
    MissingLabel,

    #[error("Model session lock poisoned")]
    Poisoned,
}

/// Whole-request failures of the inference pipeline
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Error preprocessing image: {0}")]
    Preprocessing(#[from] PreprocessingError),

    #[error("No models found for inference")]
    NoModelsAvailable,
}

impl InferenceError {
    /// Pipeline stage that failed, as reported to clients
    pub fn stage(&self) -> &'static str {
        match self {
            InferenceError::Preprocessing(_) => "preprocessing",
            InferenceError::NoModelsAvailable => "inference",
        }
    }
}
