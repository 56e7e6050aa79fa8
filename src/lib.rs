//! Ensemble Image Classifier Library
//!
//! Classifies 28x28 grayscale images by majority vote over five
//! independently trained classifiers exported to ONNX.

pub mod config;
pub mod error;
pub mod feature_extractor;
pub mod metrics;
pub mod models;
pub mod server;
pub mod status;
pub mod types;

pub use config::AppConfig;
pub use error::{InferenceError, ModelLoadError, PredictError, PreprocessingError};
pub use feature_extractor::FeatureExtractor;
pub use models::inference::InferenceEngine;
pub use status::AvailabilityReporter;
pub use types::{EnsembleResult, FeatureVector, ModelId, ModelStatusReport};
