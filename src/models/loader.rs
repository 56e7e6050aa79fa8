//! ONNX model loader

use crate::error::{ModelLoadError, PredictError};
use crate::models::classifier::{Classifier, ModelHandle};
use crate::models::registry::ModelProvider;
use crate::types::{FeatureVector, Label, ModelId};
use anyhow::{Context, Result};
use ort::session::{builder::GraphOptimizationLevel, Session};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Loaded ONNX classifier with metadata
pub struct LoadedModel {
    /// Model slot
    pub id: ModelId,
    /// Input name for the model
    pub input_name: String,
    /// Output carrying the predicted class label
    pub label_output: String,
    /// ONNX Runtime session (running needs exclusive access)
    session: Mutex<Session>,
}

impl LoadedModel {
    /// Pick the int64 label out of the session outputs.
    ///
    /// scikit-learn exports name it `label`; otherwise the first int64
    /// tensor output is used.
    fn extract_label(&self, outputs: &ort::session::SessionOutputs) -> Result<Label, PredictError> {
        if let Some(output) = outputs.get(self.label_output.as_str()) {
            if let Ok((_, data)) = output.try_extract_tensor::<i64>() {
                return data.first().copied().ok_or(PredictError::MissingLabel);
            }
        }

        for (name, output) in outputs.iter() {
            if let Ok((_, data)) = output.try_extract_tensor::<i64>() {
                if let Some(&label) = data.first() {
                    debug!(model = %self.id, output = %name, label = label, "Extracted label (fallback)");
                    return Ok(label);
                }
            }
        }

        Err(PredictError::MissingLabel)
    }
}

impl Classifier for LoadedModel {
    fn predict(&self, features: &FeatureVector) -> Result<Label, PredictError> {
        use ort::value::Tensor;

        // Prepare input tensor - shape [1, num_features]
        let shape = features.batch_shape().to_vec();
        let input_tensor = Tensor::from_array((shape, features.as_slice().to_vec()))
            .map_err(|e| PredictError::Input(e.to_string()))?;

        let mut session = self.session.lock().map_err(|_| PredictError::Poisoned)?;

        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input_tensor])
            .map_err(|e| PredictError::Runtime(e.to_string()))?;

        self.extract_label(&outputs)
    }
}

/// Loader for ONNX models
#[derive(Debug, Clone)]
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ModelLoader {
    /// Create a new model loader with default settings (1 thread)
    pub fn new() -> Self {
        Self::with_threads(1)
    }

    /// Create a new model loader with specified number of threads
    pub fn with_threads(onnx_threads: usize) -> Self {
        Self {
            onnx_threads: onnx_threads.max(1),
        }
    }

    /// Load a single ONNX model from file
    pub fn load_model<P: AsRef<Path>>(&self, path: P, id: ModelId) -> Result<LoadedModel, ModelLoadError> {
        let path = path.as_ref();

        info!(model = %id, path = %path.display(), threads = self.onnx_threads, "Loading ONNX model");

        let session = self.build_session(path).map_err(|e| ModelLoadError {
            model: id,
            path: path.to_path_buf(),
            reason: format!("{:#}", e),
        })?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        let label_output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("label"))
            .or_else(|| session.outputs.first())
            .map(|o| o.name.clone())
            .unwrap_or_else(|| "label".to_string());

        debug!(
            model = %id,
            input = %input_name,
            output = %label_output,
            "Model loaded successfully"
        );

        Ok(LoadedModel {
            id,
            input_name,
            label_output,
            session: Mutex::new(session),
        })
    }

    fn build_session(&self, path: &Path) -> Result<Session> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(self.onnx_threads)?
            .commit_from_file(path)
            .context(format!("Failed to load model from {:?}", path))?;

        Ok(session)
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves model slots to `<models_dir>/<slot>.onnx`, loading from disk on every call
#[derive(Debug, Clone)]
pub struct DiskModelProvider {
    models_dir: PathBuf,
    loader: ModelLoader,
}

impl DiskModelProvider {
    pub fn new<P: Into<PathBuf>>(models_dir: P, loader: ModelLoader) -> Self {
        Self {
            models_dir: models_dir.into(),
            loader,
        }
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    /// Location of the persisted model for a slot
    pub fn model_path(&self, id: ModelId) -> PathBuf {
        self.models_dir.join(id.file_name())
    }
}

impl ModelProvider for DiskModelProvider {
    fn exists(&self, id: ModelId) -> bool {
        self.model_path(id).exists()
    }

    fn load(&self, id: ModelId) -> Result<Option<ModelHandle>, ModelLoadError> {
        let path = self.model_path(id);
        if !path.exists() {
            return Ok(None);
        }

        let model = self.loader.load_model(&path, id)?;
        Ok(Some(ModelHandle::new(id, Arc::new(model))))
    }
}
