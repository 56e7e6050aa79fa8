//! Uniform predict capability shared by every ensemble member

use crate::error::PredictError;
use crate::types::{FeatureVector, Label, ModelId};
use std::fmt;
use std::sync::Arc;

/// A trained classifier, whatever its algorithm family.
///
/// Implementations must be safe to call from several threads at once.
pub trait Classifier: Send + Sync {
    /// Score one feature vector and return its class label
    fn predict(&self, features: &FeatureVector) -> Result<Label, PredictError>;
}

/// A loaded classifier bound to its model slot
#[derive(Clone)]
pub struct ModelHandle {
    id: ModelId,
    classifier: Arc<dyn Classifier>,
}

impl ModelHandle {
    pub fn new(id: ModelId, classifier: Arc<dyn Classifier>) -> Self {
        Self { id, classifier }
    }

    pub fn id(&self) -> ModelId {
        self.id
    }

    pub fn predict(&self, features: &FeatureVector) -> Result<Label, PredictError> {
        self.classifier.predict(features)
    }
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelHandle").field("id", &self.id).finish()
    }
}
