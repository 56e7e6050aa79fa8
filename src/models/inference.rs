//! Multi-model inference engine for image classification

use crate::config::{AppConfig, ModelCache, ModelsConfig};
use crate::error::InferenceError;
use crate::feature_extractor::FeatureExtractor;
use crate::metrics::InferenceMetrics;
use crate::models::aggregator::VoteAggregator;
use crate::models::classifier::ModelHandle;
use crate::models::loader::{DiskModelProvider, ModelLoader};
use crate::models::registry::{CachedModelProvider, ModelProvider, ModelRegistry};
use crate::types::{EnsembleResult, FeatureVector, Label, ModelId, PredictionSet};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Build the model provider selected by the configuration
pub fn build_provider(config: &ModelsConfig) -> Arc<dyn ModelProvider> {
    let disk: Arc<dyn ModelProvider> = Arc::new(DiskModelProvider::new(
        &config.models_dir,
        ModelLoader::with_threads(config.onnx_threads),
    ));

    match config.cache {
        ModelCache::PerRequest => disk,
        ModelCache::Preload => {
            let cache = CachedModelProvider::preload(disk);
            let cached = cache.cached_models();
            if cached.len() < ModelId::ALL.len() {
                warn!(cached = ?cached, "Model cache is incomplete until restart");
            }
            Arc::new(cache)
        }
    }
}

/// Ensemble inference engine: preprocess, fan out to every model, vote
pub struct InferenceEngine {
    extractor: FeatureExtractor,
    registry: ModelRegistry,
    aggregator: VoteAggregator,
    /// Score models on scoped worker threads
    parallel: bool,
    metrics: Option<Arc<InferenceMetrics>>,
}

impl InferenceEngine {
    /// Create a new inference engine from configuration
    pub fn new(config: &AppConfig) -> Self {
        let extractor =
            FeatureExtractor::with_size(config.preprocessing.width, config.preprocessing.height);
        let input_size = extractor.target_size();
        let engine = Self::with_provider(build_provider(&config.models), extractor)
            .with_parallel(config.models.parallel);

        info!(
            models_dir = %config.models.models_dir.display(),
            input_size = ?input_size,
            cache = ?config.models.cache,
            parallel = config.models.parallel,
            "Inference engine initialized"
        );

        engine
    }

    /// Create an inference engine over an explicit model provider
    pub fn with_provider(provider: Arc<dyn ModelProvider>, extractor: FeatureExtractor) -> Self {
        Self {
            extractor,
            registry: ModelRegistry::new(provider),
            aggregator: VoteAggregator::new(),
            parallel: false,
            metrics: None,
        }
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Record per-model predict latency into `metrics`
    pub fn with_metrics(mut self, metrics: Arc<InferenceMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Classify an encoded image held in memory
    pub fn classify_bytes(&self, bytes: &[u8]) -> Result<EnsembleResult, InferenceError> {
        let features = self.extractor.extract_bytes(bytes)?;
        self.predict(&features)
    }

    /// Classify an image file
    pub fn classify_path<P: AsRef<Path>>(&self, path: P) -> Result<EnsembleResult, InferenceError> {
        let features = self.extractor.extract_path(path)?;
        self.predict(&features)
    }

    /// Run every available model on the features and take the majority vote
    pub fn predict(&self, features: &FeatureVector) -> Result<EnsembleResult, InferenceError> {
        let handles = self.registry.resolve_all();
        if handles.is_empty() {
            warn!("No models could be resolved");
            return Err(InferenceError::NoModelsAvailable);
        }

        let predictions = if self.parallel {
            self.score_parallel(&handles, features)
        } else {
            self.score_sequential(&handles, features)
        };

        let result = self.aggregator.aggregate(&predictions)?;

        debug!(
            resolved = handles.len(),
            voted = predictions.len(),
            label = result.predicted_label(),
            confidence = result.confidence(),
            "Ensemble inference complete"
        );

        Ok(result)
    }

    fn score_sequential(&self, handles: &[ModelHandle], features: &FeatureVector) -> PredictionSet {
        handles
            .iter()
            .filter_map(|handle| {
                self.score_one(handle, features)
                    .map(|label| (handle.id(), label))
            })
            .collect()
    }

    /// Results are collected in slot order regardless of completion order,
    /// so the vote matches the sequential path.
    fn score_parallel(&self, handles: &[ModelHandle], features: &FeatureVector) -> PredictionSet {
        thread::scope(|scope| {
            let workers: Vec<_> = handles
                .iter()
                .map(|handle| scope.spawn(move || self.score_one(handle, features)))
                .collect();

            handles
                .iter()
                .zip(workers)
                .filter_map(|(handle, worker)| match worker.join() {
                    Ok(label) => label.map(|label| (handle.id(), label)),
                    Err(_) => {
                        warn!(model = %handle.id(), "Model worker panicked, dropping from vote");
                        None
                    }
                })
                .collect()
        })
    }

    /// A failing or panicking model is dropped from the vote instead of
    /// failing the request
    fn score_one(&self, handle: &ModelHandle, features: &FeatureVector) -> Option<Label> {
        let start = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| handle.predict(features)));

        if let Some(metrics) = &self.metrics {
            metrics.record_model_time(handle.id(), start.elapsed());
        }

        match outcome {
            Ok(Ok(label)) => {
                debug!(model = %handle.id(), label = label, "Model prediction");
                Some(label)
            }
            Ok(Err(e)) => {
                warn!(model = %handle.id(), error = %e, "Model prediction failed, dropping from vote");
                None
            }
            Err(_) => {
                warn!(model = %handle.id(), "Model panicked during prediction, dropping from vote");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::registry::testing::{Slot, StubProvider};
    use image::{DynamicImage, GrayImage, ImageFormat, Luma};
    use std::io::Cursor;
    use std::sync::atomic::Ordering;

    fn engine(provider: Arc<StubProvider>) -> InferenceEngine {
        InferenceEngine::with_provider(provider, FeatureExtractor::new())
    }

    fn features() -> FeatureVector {
        FeatureVector::new(vec![0.5; 784]).unwrap()
    }

    fn png_bytes() -> Vec<u8> {
        let image = DynamicImage::ImageLuma8(GrayImage::from_pixel(32, 32, Luma([128])));
        let mut bytes = Cursor::new(Vec::new());
        image.write_to(&mut bytes, ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    #[test]
    fn test_majority_of_all_models() {
        let engine = engine(Arc::new(StubProvider::voting(&[3, 8, 3, 8, 3])));

        let result = engine.predict(&features()).unwrap();
        assert_eq!(result.predicted_label(), 3);
        assert!((result.confidence() - 0.6).abs() < 1e-12);
        assert_eq!(result.per_model_labels().len(), 5);
    }

    #[test]
    fn test_failing_model_is_dropped() {
        let provider = Arc::new(StubProvider::new(&[
            Slot::Votes(2),
            Slot::Fails,
            Slot::Votes(2),
            Slot::Votes(5),
            Slot::Votes(2),
        ]));
        let result = engine(provider).predict(&features()).unwrap();

        assert_eq!(result.predicted_label(), 2);
        assert_eq!(result.confidence(), 0.75);
        assert!(!result
            .per_model_labels()
            .contains_key(&ModelId::LogisticRegression));
        assert_eq!(result.all_labels(), &[2, 2, 5, 2]);
    }

    #[test]
    fn test_missing_and_corrupt_models_do_not_vote() {
        let provider = Arc::new(StubProvider::new(&[
            Slot::Missing,
            Slot::Corrupt,
            Slot::Votes(9),
            Slot::Missing,
            Slot::Votes(9),
        ]));
        let result = engine(provider).predict(&features()).unwrap();

        assert_eq!(result.predicted_label(), 9);
        assert_eq!(result.confidence(), 1.0);
        assert_eq!(result.model_count(), 2);
    }

    #[test]
    fn test_no_models_available() {
        let err = engine(Arc::new(StubProvider::new(&[])))
            .predict(&features())
            .unwrap_err();
        assert!(matches!(err, InferenceError::NoModelsAvailable));
    }

    #[test]
    fn test_every_model_failing_is_no_models_available() {
        let provider = Arc::new(StubProvider::new(&[Slot::Fails, Slot::Corrupt, Slot::Fails]));
        let err = engine(provider).predict(&features()).unwrap_err();
        assert!(matches!(err, InferenceError::NoModelsAvailable));
    }

    #[test]
    fn test_bad_image_short_circuits_before_models() {
        let provider = Arc::new(StubProvider::voting(&[1, 1, 1, 1, 1]));
        let engine = engine(provider.clone());

        let err = engine.classify_bytes(b"GIF89a but not really").unwrap_err();

        assert!(matches!(err, InferenceError::Preprocessing(_)));
        assert_eq!(err.stage(), "preprocessing");
        assert_eq!(provider.loads.load(Ordering::SeqCst), 0);
        assert_eq!(provider.predict_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_classify_bytes_runs_every_model() {
        let provider = Arc::new(StubProvider::voting(&[6, 6, 1, 6, 1]));
        let engine = engine(provider.clone());

        let result = engine.classify_bytes(&png_bytes()).unwrap();

        assert_eq!(result.predicted_label(), 6);
        assert_eq!(provider.predict_calls.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_models_reload_on_every_request() {
        let provider = Arc::new(StubProvider::voting(&[1, 1, 1, 1, 1]));
        let engine = engine(provider.clone());

        engine.predict(&features()).unwrap();
        engine.predict(&features()).unwrap();

        assert_eq!(provider.loads.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let slots = [
            Slot::Votes(4),
            Slot::Votes(7),
            Slot::Fails,
            Slot::Votes(7),
            Slot::Votes(4),
        ];
        let sequential = engine(Arc::new(StubProvider::new(&slots)));
        let parallel = engine(Arc::new(StubProvider::new(&slots))).with_parallel(true);

        let expected = sequential.predict(&features()).unwrap();
        for _ in 0..20 {
            let result = parallel.predict(&features()).unwrap();
            assert_eq!(result, expected);
            assert_eq!(result.predicted_label(), 4);
            assert_eq!(result.all_labels(), &[4, 7, 7, 4]);
        }
    }

    #[test]
    fn test_panicking_model_is_dropped_in_both_modes() {
        let slots = [Slot::Votes(1), Slot::Panics, Slot::Votes(1), Slot::Votes(8)];
        let sequential = engine(Arc::new(StubProvider::new(&slots)));
        let parallel = engine(Arc::new(StubProvider::new(&slots))).with_parallel(true);

        let expected = sequential.predict(&features()).unwrap();
        assert_eq!(expected.predicted_label(), 1);
        assert_eq!(expected.model_count(), 3);
        assert!(!expected
            .per_model_labels()
            .contains_key(&ModelId::LogisticRegression));

        assert_eq!(parallel.predict(&features()).unwrap(), expected);
    }

    #[test]
    fn test_records_model_times() {
        let metrics = Arc::new(InferenceMetrics::new());
        let engine = engine(Arc::new(StubProvider::voting(&[1, 2])))
            .with_metrics(metrics.clone());

        engine.predict(&features()).unwrap();

        let stats = metrics.get_model_stats();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[&ModelId::DecisionTree].calls, 1);
    }

    #[test]
    fn test_build_provider_from_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = ModelsConfig {
            models_dir: dir.path().to_path_buf(),
            ..ModelsConfig::default()
        };

        let provider = build_provider(&config);
        assert!(ModelId::ALL.iter().all(|&id| !provider.exists(id)));

        let engine = InferenceEngine::with_provider(provider, FeatureExtractor::new());
        assert!(matches!(
            engine.predict(&features()),
            Err(InferenceError::NoModelsAvailable)
        ));
    }
}
