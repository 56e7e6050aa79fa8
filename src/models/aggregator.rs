//! Majority-vote aggregation for the multi-model ensemble

use crate::error::InferenceError;
use crate::types::{EnsembleResult, Label, PredictionSet};
use std::collections::BTreeMap;

/// Reduces per-model labels to one label and a vote-fraction confidence.
///
/// Ties are broken by first appearance: among labels sharing the highest
/// vote count, the one voted for by the earliest model in slot order wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct VoteAggregator;

impl VoteAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Aggregate the votes of every contributing model.
    ///
    /// Fails with [`InferenceError::NoModelsAvailable`] when nothing voted.
    pub fn aggregate(&self, predictions: &PredictionSet) -> Result<EnsembleResult, InferenceError> {
        let (label, votes) =
            Self::majority(predictions).ok_or(InferenceError::NoModelsAvailable)?;

        let confidence = votes as f64 / predictions.len() as f64;

        let per_model_labels: BTreeMap<_, _> =
            predictions.iter().map(|p| (p.model, p.label)).collect();

        Ok(EnsembleResult::new(
            label,
            confidence,
            per_model_labels,
            predictions.labels(),
        ))
    }

    /// Most voted label and its vote count, `None` for an empty set.
    pub fn majority(predictions: &PredictionSet) -> Option<(Label, usize)> {
        let mut best: Option<(Label, usize)> = None;

        for (label, votes) in Self::vote_counts(predictions) {
            // strictly greater: an equal count never displaces an earlier label
            if best.map_or(true, |(_, top)| votes > top) {
                best = Some((label, votes));
            }
        }

        best
    }

    /// Vote count per label, ordered by each label's first appearance.
    pub fn vote_counts(predictions: &PredictionSet) -> Vec<(Label, usize)> {
        let mut counts: Vec<(Label, usize)> = Vec::new();

        for prediction in predictions.iter() {
            match counts.iter_mut().find(|(label, _)| *label == prediction.label) {
                Some((_, votes)) => *votes += 1,
                None => counts.push((prediction.label, 1)),
            }
        }

        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ModelId;

    fn votes(labels: &[Label]) -> PredictionSet {
        ModelId::ALL.into_iter().zip(labels.iter().copied()).collect()
    }

    #[test]
    fn test_unanimous_vote() {
        let result = VoteAggregator::new().aggregate(&votes(&[7, 7, 7, 7, 7])).unwrap();

        assert_eq!(result.predicted_label(), 7);
        assert_eq!(result.confidence(), 1.0);
        assert_eq!(result.model_count(), 5);
    }

    #[test]
    fn test_three_two_split() {
        let result = VoteAggregator::new().aggregate(&votes(&[1, 2, 1, 2, 1])).unwrap();

        assert_eq!(result.predicted_label(), 1);
        assert!((result.confidence() - 0.6).abs() < 1e-12);
        assert_eq!(result.all_labels(), &[1, 2, 1, 2, 1]);
    }

    #[test]
    fn test_tie_goes_to_first_appearing_label() {
        let aggregator = VoteAggregator::new();

        // 4 and 9 both reach two votes; 4 was voted first
        let result = aggregator.aggregate(&votes(&[4, 9, 9, 4])).unwrap();
        assert_eq!(result.predicted_label(), 4);
        assert_eq!(result.confidence(), 0.5);

        let result = aggregator.aggregate(&votes(&[9, 4, 4, 9])).unwrap();
        assert_eq!(result.predicted_label(), 9);
    }

    #[test]
    fn test_tie_is_stable_across_runs() {
        let aggregator = VoteAggregator::new();
        let set = votes(&[3, 5, 5, 3]);

        let first = aggregator.aggregate(&set).unwrap();
        for _ in 0..10 {
            assert_eq!(aggregator.aggregate(&set).unwrap(), first);
        }
    }

    #[test]
    fn test_all_distinct_labels() {
        let result = VoteAggregator::new().aggregate(&votes(&[0, 1, 2, 3, 4])).unwrap();

        assert_eq!(result.predicted_label(), 0);
        assert!((result.confidence() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_empty_set_is_no_models_available() {
        let err = VoteAggregator::new().aggregate(&PredictionSet::new()).unwrap_err();
        assert!(matches!(err, InferenceError::NoModelsAvailable));
    }

    #[test]
    fn test_per_model_breakdown_only_has_contributors() {
        let set: PredictionSet = [(ModelId::LogisticRegression, 2), (ModelId::Svm, 8)]
            .into_iter()
            .collect();

        let result = VoteAggregator::new().aggregate(&set).unwrap();

        assert_eq!(result.per_model_labels().len(), 2);
        assert_eq!(result.per_model_labels()[&ModelId::Svm], 8);
        assert!(!result.per_model_labels().contains_key(&ModelId::DecisionTree));
        assert_eq!(result.predicted_label(), 2);
    }

    #[test]
    fn test_vote_counts_order() {
        let counts = VoteAggregator::vote_counts(&votes(&[6, 2, 6, 5, 2]));
        assert_eq!(counts, vec![(6, 2), (2, 2), (5, 1)]);
    }
}
