//! Identifiers for the fixed set of ensemble members

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the five model slots served by the ensemble.
///
/// Variant order is the slot order: it fixes the order in which models are
/// scored and therefore which label wins a tied vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ModelId {
    #[serde(rename = "dt_model")]
    DecisionTree,
    #[serde(rename = "lr_model")]
    LogisticRegression,
    #[serde(rename = "nb_model")]
    NaiveBayes,
    #[serde(rename = "rf_model")]
    RandomForest,
    #[serde(rename = "svm_model")]
    Svm,
}

impl ModelId {
    /// Every slot, in scoring order
    pub const ALL: [ModelId; 5] = [
        ModelId::DecisionTree,
        ModelId::LogisticRegression,
        ModelId::NaiveBayes,
        ModelId::RandomForest,
        ModelId::Svm,
    ];

    /// Stable name used in responses and logs
    pub fn name(&self) -> &'static str {
        match self {
            ModelId::DecisionTree => "dt_model",
            ModelId::LogisticRegression => "lr_model",
            ModelId::NaiveBayes => "nb_model",
            ModelId::RandomForest => "rf_model",
            ModelId::Svm => "svm_model",
        }
    }

    /// Algorithm family behind the slot
    pub fn algorithm(&self) -> &'static str {
        match self {
            ModelId::DecisionTree => "decision_tree",
            ModelId::LogisticRegression => "logistic_regression",
            ModelId::NaiveBayes => "naive_bayes",
            ModelId::RandomForest => "random_forest",
            ModelId::Svm => "svm",
        }
    }

    /// File name of the persisted ONNX export inside the models directory
    pub fn file_name(&self) -> String {
        format!("{}.onnx", self.name())
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
