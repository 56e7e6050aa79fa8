//! ML model inference components

pub mod aggregator;
pub mod classifier;
pub mod inference;
pub mod loader;
pub mod registry;

pub use aggregator::VoteAggregator;
pub use classifier::{Classifier, ModelHandle};
pub use inference::InferenceEngine;
pub use loader::{DiskModelProvider, ModelLoader};
pub use registry::{CachedModelProvider, ModelProvider, ModelRegistry};
