//! Model Check Tool
//!
//! Loads every ensemble model and scores a random sample with each of them,
//! without starting the HTTP server.
//!
//! Usage: `check_models [models_dir] [samples]`

use ensemble_classifier::{
    config::AppConfig,
    models::{DiskModelProvider, ModelLoader, ModelProvider},
    FeatureExtractor, FeatureVector, ModelId,
};
use rand::Rng;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Outcome of checking one model slot
enum SlotStatus {
    Working(Vec<i64>),
    Missing,
    Broken(String),
}

/// Random feature vectors in the same `[0, 1]` range as preprocessed images
fn random_sample(rng: &mut impl Rng, len: usize) -> anyhow::Result<FeatureVector> {
    let values: Vec<f32> = (0..len).map(|_| rng.gen_range(0.0..=1.0)).collect();
    Ok(FeatureVector::new(values)?)
}

fn check_slot(
    provider: &DiskModelProvider,
    id: ModelId,
    samples: &[FeatureVector],
) -> SlotStatus {
    let handle = match provider.load(id) {
        Ok(Some(handle)) => handle,
        Ok(None) => return SlotStatus::Missing,
        Err(e) => return SlotStatus::Broken(e.to_string()),
    };

    let mut labels = Vec::with_capacity(samples.len());
    for sample in samples {
        match handle.predict(sample) {
            Ok(label) => labels.push(label),
            Err(e) => return SlotStatus::Broken(e.to_string()),
        }
    }

    SlotStatus::Working(labels)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("check_models=info".parse()?),
        )
        .init();

    let config = AppConfig::load()?;

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let models_dir = args
        .get(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| config.models.models_dir.clone());
    let sample_count: usize = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(1);

    info!("=== Testing ML Models ===");

    let extractor =
        FeatureExtractor::with_size(config.preprocessing.width, config.preprocessing.height);
    let mut rng = rand::thread_rng();
    let samples = (0..sample_count.max(1))
        .map(|_| random_sample(&mut rng, extractor.feature_count()))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let provider = DiskModelProvider::new(
        &models_dir,
        ModelLoader::with_threads(config.models.onnx_threads),
    );
    info!(models_dir = %provider.models_dir().display(), samples = sample_count, "Configuration loaded");

    let mut working = Vec::new();
    let mut missing = Vec::new();
    let mut broken = Vec::new();

    for id in ModelId::ALL {
        match check_slot(&provider, id, &samples) {
            SlotStatus::Working(labels) => {
                info!(model = %id, algorithm = id.algorithm(), predictions = ?labels, "✓ Working");
                working.push(id);
            }
            SlotStatus::Missing => {
                warn!(model = %id, path = %provider.model_path(id).display(), "✗ File not found");
                missing.push(id);
            }
            SlotStatus::Broken(reason) => {
                error!(model = %id, error = %reason, "✗ Error");
                broken.push(id);
            }
        }
    }

    info!("=== Model Status Summary ===");
    info!(
        "Total: {}, Available: {}, Working: {}, Missing: {}, Broken: {}",
        ModelId::ALL.len(),
        ModelId::ALL.len() - missing.len(),
        working.len(),
        missing.len(),
        broken.len()
    );

    if working.len() == ModelId::ALL.len() {
        info!("All models are working correctly!");
        Ok(())
    } else {
        anyhow::bail!(
            "{}/{} models are working (missing: {:?}, broken: {:?})",
            working.len(),
            ModelId::ALL.len(),
            missing,
            broken
        )
    }
}
