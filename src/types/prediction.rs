//! Feature vectors, per-model predictions and the final ensemble result

use crate::error::PreprocessingError;
use crate::types::ModelId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Class label produced by a classifier
pub type Label = i64;

/// Normalized, flattened image presented to every model as a single sample.
///
/// Every value lies in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: Vec<f32>,
}

impl FeatureVector {
    /// Wrap already-normalized values, rejecting empty or out-of-range input
    pub fn new(values: Vec<f32>) -> Result<Self, PreprocessingError> {
        if values.is_empty() {
            return Err(PreprocessingError::NoPixels);
        }

        if let Some((index, &value)) = values
            .iter()
            .enumerate()
            .find(|(_, v)| !(0.0..=1.0).contains(*v))
        {
            return Err(PreprocessingError::OutOfRange { index, value });
        }

        Ok(Self { values })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    /// Batch shape `[1, n]`: one sample per invocation
    pub fn batch_shape(&self) -> [i64; 2] {
        [1, self.values.len() as i64]
    }
}

/// One model's vote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prediction {
    pub model: ModelId,
    pub label: Label,
}

/// Votes collected during one inference run, kept in slot order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PredictionSet {
    predictions: Vec<Prediction>,
}

impl PredictionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, model: ModelId, label: Label) {
        self.predictions.push(Prediction { model, label });
    }

    pub fn len(&self) -> usize {
        self.predictions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predictions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Prediction> {
        self.predictions.iter()
    }

    /// Labels in the order they were collected
    pub fn labels(&self) -> Vec<Label> {
        self.predictions.iter().map(|p| p.label).collect()
    }
}

impl FromIterator<(ModelId, Label)> for PredictionSet {
    fn from_iter<I: IntoIterator<Item = (ModelId, Label)>>(iter: I) -> Self {
        let mut set = PredictionSet::new();
        for (model, label) in iter {
            set.push(model, label);
        }
        set
    }
}

/// Final answer of the ensemble for one image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleResult {
    predicted_label: Label,
    confidence: f64,
    per_model_labels: BTreeMap<ModelId, Label>,
    all_labels: Vec<Label>,
}

impl EnsembleResult {
    pub(crate) fn new(
        predicted_label: Label,
        confidence: f64,
        per_model_labels: BTreeMap<ModelId, Label>,
        all_labels: Vec<Label>,
    ) -> Self {
        Self {
            predicted_label,
            confidence,
            per_model_labels,
            all_labels,
        }
    }

    /// Majority label
    pub fn predicted_label(&self) -> Label {
        self.predicted_label
    }

    /// Fraction of contributing models that voted for the majority label
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Label of every model that contributed, keyed by slot
    pub fn per_model_labels(&self) -> &BTreeMap<ModelId, Label> {
        &self.per_model_labels
    }

    /// Every contributed label in slot order
    pub fn all_labels(&self) -> &[Label] {
        &self.all_labels
    }

    /// Number of models that contributed a vote
    pub fn model_count(&self) -> usize {
        self.all_labels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_vector_rejects_out_of_range() {
        let err = FeatureVector::new(vec![0.0, 0.5, 1.2]).unwrap_err();
        assert!(matches!(
            err,
            PreprocessingError::OutOfRange { index: 2, .. }
        ));
    }

    #[test]
    fn test_feature_vector_rejects_empty_and_nan() {
        assert!(matches!(
            FeatureVector::new(Vec::new()),
            Err(PreprocessingError::NoPixels)
        ));
        assert!(FeatureVector::new(vec![f32::NAN]).is_err());
    }

    #[test]
    fn test_feature_vector_batch_shape() {
        let features = FeatureVector::new(vec![0.25; 784]).unwrap();
        assert_eq!(features.batch_shape(), [1, 784]);
        assert_eq!(features.len(), 784);
    }

    #[test]
    fn test_prediction_set_keeps_insertion_order() {
        let set: PredictionSet = [(ModelId::NaiveBayes, 4), (ModelId::DecisionTree, 7)]
            .into_iter()
            .collect();

        assert_eq!(set.labels(), vec![4, 7]);
        assert_eq!(set.iter().next().unwrap().model, ModelId::NaiveBayes);
    }

    #[test]
    fn test_ensemble_result_serialization() {
        let mut per_model = BTreeMap::new();
        per_model.insert(ModelId::DecisionTree, 3);
        per_model.insert(ModelId::Svm, 3);

        let result = EnsembleResult::new(3, 1.0, per_model, vec![3, 3]);
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["predicted_label"], 3);
        assert_eq!(json["per_model_labels"]["dt_model"], 3);
        assert_eq!(json["per_model_labels"]["svm_model"], 3);
        assert_eq!(json["all_labels"], serde_json::json!([3, 3]));
    }
}
