//! Common interface over the trained classifiers.

use crate::data::{CancerType, ExpressionMatrix};
use crate::error::Result;
use crate::model::forest::RandomForest;
use crate::model::linear::{LinearKind, LinearModel};
use serde::{Deserialize, Serialize};

/// Model families the training stage can fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Multinomial logistic regression.
    Logistic,
    /// One-vs-rest linear SVM.
    Svm,
    /// Random forest.
    RandomForest,
}

impl ModelKind {
    /// Display name used in reports.
    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::Logistic => "logistic_regression",
            ModelKind::Svm => "linear_svm",
            ModelKind::RandomForest => "random_forest",
        }
    }
}

/// A fitted model that maps samples to class indices.
pub trait Classifier {
    /// Which family the model belongs to.
    fn kind(&self) -> ModelKind;

    /// Class labels, indexed by the predicted class index.
    fn classes(&self) -> &[CancerType];

    /// Features expected as input columns, in order.
    fn feature_ids(&self) -> &[String];

    /// Predicted class index for each sample.
    fn predict(&self, x: &ExpressionMatrix) -> Result<Vec<usize>>;

    /// Report name of the model.
    fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Predicted class labels for each sample.
    fn predict_labels(&self, x: &ExpressionMatrix) -> Result<Vec<CancerType>> {
        let classes = self.classes();
        Ok(self.predict(x)?.into_iter().map(|c| classes[c]).collect())
    }
}

impl Classifier for LinearModel {
    fn kind(&self) -> ModelKind {
        match self.kind {
            LinearKind::Logistic => ModelKind::Logistic,
            LinearKind::Svm => ModelKind::Svm,
        }
    }

    fn classes(&self) -> &[CancerType] {
        &self.classes
    }

    fn feature_ids(&self) -> &[String] {
        &self.feature_ids
    }

    fn predict(&self, x: &ExpressionMatrix) -> Result<Vec<usize>> {
        LinearModel::predict(self, x)
    }
}

impl Classifier for RandomForest {
    fn kind(&self) -> ModelKind {
        ModelKind::RandomForest
    }

    fn classes(&self) -> &[CancerType] {
        &self.classes
    }

    fn feature_ids(&self) -> &[String] {
        &self.feature_ids
    }

    fn predict(&self, x: &ExpressionMatrix) -> Result<Vec<usize>> {
        RandomForest::predict(self, x)
    }
}

/// Any trained model, in persisted form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum SavedModel {
    /// Logistic regression or linear SVM.
    Linear(LinearModel),
    /// Random forest.
    Forest(RandomForest),
}

impl SavedModel {
    fn inner(&self) -> &dyn Classifier {
        match self {
            SavedModel::Linear(m) => m,
            SavedModel::Forest(m) => m,
        }
    }
}

impl Classifier for SavedModel {
    fn kind(&self) -> ModelKind {
        self.inner().kind()
    }

    fn classes(&self) -> &[CancerType] {
        self.inner().classes()
    }

    fn feature_ids(&self) -> &[String] {
        self.inner().feature_ids()
    }

    fn predict(&self, x: &ExpressionMatrix) -> Result<Vec<usize>> {
        self.inner().predict(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_saved_model_json_roundtrip() {
        let model = LinearModel {
            kind: LinearKind::Svm,
            classes: vec![CancerType::BRCA, CancerType::PRAD],
            feature_ids: vec!["gene_1".into()],
            coefficients: vec![vec![0.1 + 0.2], vec![-1.0 / 3.0]],
            intercepts: vec![1e-17, 2.0],
        };
        let saved = SavedModel::Linear(model);
        let json = serde_json::to_string(&saved).unwrap();
        assert!(json.contains(r#""family":"linear""#));
        let back: SavedModel = serde_json::from_str(&json).unwrap();
        assert_eq!(back, saved);
        assert_eq!(back.name(), "linear_svm");
    }
}
