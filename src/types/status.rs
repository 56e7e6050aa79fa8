//! Model availability report

use crate::types::ModelId;
use serde::{Deserialize, Serialize};

/// Presence of one model slot in persistent storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelAvailability {
    pub model: ModelId,
    pub present: bool,
}

/// Which model slots are present on disk and which are missing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelStatusReport {
    pub available: Vec<ModelId>,
    pub missing: Vec<ModelId>,
    pub total_count: usize,
    pub available_count: usize,
}

impl ModelStatusReport {
    /// Split per-slot availability into disjoint available/missing lists
    pub fn from_availability(entries: &[ModelAvailability]) -> Self {
        let (present, absent): (Vec<&ModelAvailability>, Vec<&ModelAvailability>) = entries.iter().partition(|e| e.present);

        let available: Vec<ModelId> = present.into_iter().map(|e| e.model).collect();
        let missing: Vec<ModelId> = absent.into_iter().map(|e| e.model).collect();

        Self {
            available_count: available.len(),
            total_count: entries.len(),
            available,
            missing,
        }
    }

    pub fn all_available(&self) -> bool {
        self.missing.is_empty()
    }
}
