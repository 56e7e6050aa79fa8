//! Model registry: resolves the five fixed model slots independently

use crate::error::ModelLoadError;
use crate::models::classifier::ModelHandle;
use crate::types::ModelId;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Access to persisted models, one slot at a time.
pub trait ModelProvider: Send + Sync {
    /// Whether a persisted model exists for the slot. Must not load it.
    fn exists(&self, id: ModelId) -> bool;

    /// Load the slot's model. `Ok(None)` means the model is absent.
    fn load(&self, id: ModelId) -> Result<Option<ModelHandle>, ModelLoadError>;
}

/// Read-only cache of models loaded once at start-up.
///
/// Slots that were missing or failed to load stay absent for the lifetime of
/// the cache. Existence checks still go to the underlying storage.
pub struct CachedModelProvider {
    storage: Arc<dyn ModelProvider>,
    loaded: BTreeMap<ModelId, ModelHandle>,
}

impl CachedModelProvider {
    /// Load every slot from `storage` once
    pub fn preload(storage: Arc<dyn ModelProvider>) -> Self {
        let loaded: BTreeMap<ModelId, ModelHandle> = ModelRegistry::new(storage.clone())
            .resolve_all()
            .into_iter()
            .map(|handle| (handle.id(), handle))
            .collect();

        info!(
            cached = loaded.len(),
            total = ModelId::ALL.len(),
            "Model cache initialized"
        );

        Self { storage, loaded }
    }

    /// Slots held in the cache
    pub fn cached_models(&self) -> Vec<ModelId> {
        self.loaded.keys().copied().collect()
    }
}

impl ModelProvider for CachedModelProvider {
    fn exists(&self, id: ModelId) -> bool {
        self.storage.exists(id)
    }

    fn load(&self, id: ModelId) -> Result<Option<ModelHandle>, ModelLoadError> {
        Ok(self.loaded.get(&id).cloned())
    }
}

/// Resolves which of the fixed model slots can currently serve predictions
#[derive(Clone)]
pub struct ModelRegistry {
    provider: Arc<dyn ModelProvider>,
}

impl ModelRegistry {
    pub fn new(provider: Arc<dyn ModelProvider>) -> Self {
        Self { provider }
    }

    /// The fixed model slots, in scoring order
    pub fn model_ids(&self) -> &'static [ModelId] {
        &ModelId::ALL
    }

    pub fn provider(&self) -> &Arc<dyn ModelProvider> {
        &self.provider
    }

    /// Load every slot that can be loaded, in slot order.
    ///
    /// A missing or corrupt model only removes its own slot.
    pub fn resolve_all(&self) -> Vec<ModelHandle> {
        let mut handles = Vec::with_capacity(ModelId::ALL.len());

        for &id in self.model_ids() {
            match self.provider.load(id) {
                Ok(Some(handle)) => handles.push(handle),
                Ok(None) => {
                    warn!(model = %id, "Model not found, skipping");
                }
                Err(e) => {
                    warn!(model = %id, error = %e, "Failed to load model, skipping");
                }
            }
        }

        handles
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory provider and scripted classifiers shared by unit tests

    use super::*;
    use crate::error::PredictError;
    use crate::models::classifier::Classifier;
    use crate::types::{FeatureVector, Label};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted state of one slot
    #[derive(Clone, Copy)]
    pub enum Slot {
        Missing,
        Corrupt,
        Votes(Label),
        Fails,
        /// Predict panics
        Panics,
        /// Loading panics
        LoadPanics,
    }

    pub struct FixedClassifier {
        slot: Slot,
        pub calls: Arc<AtomicUsize>,
    }

    impl Classifier for FixedClassifier {
        fn predict(&self, _features: &FeatureVector) -> Result<Label, PredictError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.slot {
                Slot::Votes(label) => Ok(label),
                Slot::Panics => panic!("scripted panic"),
                _ => Err(PredictError::Runtime("scripted failure".to_string())),
            }
        }
    }

    pub struct StubProvider {
        slots: BTreeMap<ModelId, Slot>,
        pub loads: AtomicUsize,
        pub predict_calls: Arc<AtomicUsize>,
    }

    impl StubProvider {
        /// Slots given in `ModelId::ALL` order; unspecified slots are missing
        pub fn new(slots: &[Slot]) -> Self {
            Self {
                slots: ModelId::ALL.into_iter().zip(slots.iter().copied()).collect(),
                loads: AtomicUsize::new(0),
                predict_calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        pub fn voting(labels: &[Label]) -> Self {
            let slots: Vec<Slot> = labels.iter().map(|&l| Slot::Votes(l)).collect();
            Self::new(&slots)
        }

        fn slot(&self, id: ModelId) -> Slot {
            self.slots.get(&id).copied().unwrap_or(Slot::Missing)
        }
    }

    impl ModelProvider for StubProvider {
        fn exists(&self, id: ModelId) -> bool {
            !matches!(self.slot(id), Slot::Missing)
        }

        fn load(&self, id: ModelId) -> Result<Option<ModelHandle>, ModelLoadError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            let slot = self.slot(id);
            match slot {
                Slot::Missing => return Ok(None),
                Slot::Corrupt => {
                    return Err(ModelLoadError {
                        model: id,
                        path: PathBuf::from(id.file_name()),
                        reason: "truncated file".to_string(),
                    })
                }
                Slot::LoadPanics => panic!("scripted load panic"),
                Slot::Votes(_) | Slot::Fails | Slot::Panics => {}
            }

            let classifier = FixedClassifier {
                slot,
                calls: self.predict_calls.clone(),
            };
            Ok(Some(ModelHandle::new(id, Arc::new(classifier))))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{Slot, StubProvider};
    use super::*;
    use std::sync::atomic::Ordering;

    #[test]
    fn test_resolves_all_present_models_in_slot_order() {
        let registry = ModelRegistry::new(Arc::new(StubProvider::voting(&[1, 2, 3, 4, 5])));

        let ids: Vec<ModelId> = registry.resolve_all().iter().map(|h| h.id()).collect();
        assert_eq!(ids, ModelId::ALL.to_vec());
    }

    #[test]
    fn test_missing_and_corrupt_slots_are_isolated() {
        let provider = StubProvider::new(&[
            Slot::Votes(1),
            Slot::Missing,
            Slot::Corrupt,
            Slot::Votes(4),
            Slot::Votes(5),
        ]);
        let registry = ModelRegistry::new(Arc::new(provider));

        let ids: Vec<ModelId> = registry.resolve_all().iter().map(|h| h.id()).collect();
        assert_eq!(
            ids,
            vec![ModelId::DecisionTree, ModelId::RandomForest, ModelId::Svm]
        );
    }

    #[test]
    fn test_no_models_resolves_to_empty() {
        let registry = ModelRegistry::new(Arc::new(StubProvider::new(&[])));
        assert!(registry.resolve_all().is_empty());
    }

    #[test]
    fn test_cached_provider_loads_once() {
        let storage = Arc::new(StubProvider::new(&[
            Slot::Votes(1),
            Slot::Corrupt,
            Slot::Votes(3),
        ]));
        let cache = CachedModelProvider::preload(storage.clone());
        assert_eq!(storage.loads.load(Ordering::SeqCst), 5);

        let registry = ModelRegistry::new(Arc::new(cache));
        for _ in 0..3 {
            assert_eq!(registry.resolve_all().len(), 2);
        }

        assert_eq!(storage.loads.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_cached_provider_checks_storage_for_existence() {
        let storage = Arc::new(StubProvider::new(&[Slot::Votes(1), Slot::Corrupt]));
        let cache = CachedModelProvider::preload(storage);

        assert_eq!(cache.cached_models(), vec![ModelId::DecisionTree]);
        assert!(cache.exists(ModelId::LogisticRegression));
        assert!(!cache.exists(ModelId::Svm));
    }
}
