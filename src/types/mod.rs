//! Type definitions for the ensemble pipeline

pub mod model_id;
pub mod prediction;
pub mod status;

pub use model_id::ModelId;
pub use prediction::{EnsembleResult, FeatureVector, Label, Prediction, PredictionSet};
pub use status::{ModelAvailability, ModelStatusReport};
