//! Model availability reporting for health/status surfacing

use crate::models::registry::ModelProvider;
use crate::types::{ModelAvailability, ModelId, ModelStatusReport};
use std::sync::Arc;

/// Reports which model slots are present in storage without loading any of them
#[derive(Clone)]
pub struct AvailabilityReporter {
    provider: Arc<dyn ModelProvider>,
}

impl AvailabilityReporter {
    pub fn new(provider: Arc<dyn ModelProvider>) -> Self {
        Self { provider }
    }

    /// Presence of every slot, in slot order. Recomputed on each call.
    pub fn availability(&self) -> Vec<ModelAvailability> {
        ModelId::ALL
            .iter()
            .map(|&model| ModelAvailability {
                model,
                present: self.provider.exists(model),
            })
            .collect()
    }

    pub fn report(&self) -> ModelStatusReport {
        ModelStatusReport::from_availability(&self.availability())
    }
}
