//! Linear multi-class model shared by logistic regression and linear SVM.

use crate::data::{CancerType, ExpressionMatrix};
use crate::error::{BiomarkerError, Result};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Loss a linear model was trained with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinearKind {
    /// Multinomial logistic regression (softmax).
    Logistic,
    /// One-vs-rest linear SVM (squared hinge).
    Svm,
}

/// A trained linear classifier.
///
/// Holds one coefficient vector and one intercept per class. Immutable after
/// training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    /// Training loss.
    pub kind: LinearKind,
    /// Class labels, in the order of the coefficient rows.
    pub classes: Vec<CancerType>,
    /// Feature identifiers, in the order of the coefficient columns.
    pub feature_ids: Vec<String>,
    /// Per-class coefficient vectors (classes × features).
    pub coefficients: Vec<Vec<f64>>,
    /// Per-class intercepts.
    pub intercepts: Vec<f64>,
}

impl LinearModel {
    /// Assemble a model from a parameter matrix of shape (features + 1) × classes,
    /// whose last row holds the intercepts.
    pub(crate) fn from_parameters(
        kind: LinearKind,
        classes: Vec<CancerType>,
        feature_ids: Vec<String>,
        params: &DMatrix<f64>,
    ) -> Self {
        let p = feature_ids.len();
        let coefficients = (0..classes.len())
            .map(|c| (0..p).map(|j| params[(j, c)]).collect())
            .collect();
        let intercepts = (0..classes.len()).map(|c| params[(p, c)]).collect();
        Self {
            kind,
            classes,
            feature_ids,
            coefficients,
            intercepts,
        }
    }

    /// Number of classes.
    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    /// Number of features.
    pub fn n_features(&self) -> usize {
        self.feature_ids.len()
    }

    /// Raw class scores (samples × classes).
    pub fn decision_function(&self, x: &ExpressionMatrix) -> Result<DMatrix<f64>> {
        if x.n_features() != self.n_features() {
            return Err(BiomarkerError::DimensionMismatch {
                expected: self.n_features(),
                actual: x.n_features(),
            });
        }
        let data = x.data();
        Ok(DMatrix::from_fn(x.n_samples(), self.n_classes(), |i, c| {
            let coef = &self.coefficients[c];
            self.intercepts[c] + (0..coef.len()).map(|j| coef[j] * data[(i, j)]).sum::<f64>()
        }))
    }

    /// Class probabilities from the softmax of the class scores.
    ///
    /// Only meaningful for logistic models; SVM scores are margins.
    pub fn predict_proba(&self, x: &ExpressionMatrix) -> Result<DMatrix<f64>> {
        let mut scores = self.decision_function(x)?;
        for mut row in scores.row_iter_mut() {
            let max = row.max();
            row.apply(|v| *v = (*v - max).exp());
            let total = row.sum();
            row /= total;
        }
        Ok(scores)
    }

    /// Predicted class index for each sample.
    pub fn predict(&self, x: &ExpressionMatrix) -> Result<Vec<usize>> {
        let scores = self.decision_function(x)?;
        Ok(scores.row_iter().map(|row| argmax(row.iter().copied())).collect())
    }
}

/// Index of the largest value; ties go to the first.
pub(crate) fn argmax<I: Iterator<Item = f64>>(values: I) -> usize {
    let mut best = 0;
    let mut best_value = f64::NEG_INFINITY;
    for (i, v) in values.enumerate() {
        if v > best_value {
            best = i;
            best_value = v;
        }
    }
    best
}

/// Append a column of ones so the last parameter acts as an intercept.
pub(crate) fn with_bias_column(x: &ExpressionMatrix) -> DMatrix<f64> {
    let p = x.n_features();
    let data = x.data();
    DMatrix::from_fn(x.n_samples(), p + 1, |i, j| if j < p { data[(i, j)] } else { 1.0 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn model() -> LinearModel {
        LinearModel {
            kind: LinearKind::Logistic,
            classes: vec![CancerType::BRCA, CancerType::LUAD],
            feature_ids: vec!["gene_0".into(), "gene_1".into()],
            coefficients: vec![vec![1.0, 0.0], vec![-1.0, 0.5]],
            intercepts: vec![0.0, 0.25],
        }
    }

    fn input() -> ExpressionMatrix {
        ExpressionMatrix::new(
            DMatrix::from_row_slice(2, 2, &[2.0, 0.0, -1.0, 1.0]),
            vec!["a".into(), "b".into()],
            vec!["gene_0".into(), "gene_1".into()],
        )
        .unwrap()
    }

    #[test]
    fn test_predict() {
        let m = model();
        let scores = m.decision_function(&input()).unwrap();
        assert_relative_eq!(scores[(0, 0)], 2.0);
        assert_relative_eq!(scores[(1, 1)], 1.75);
        assert_eq!(m.predict(&input()).unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_predict_proba_rows_sum_to_one() {
        let probs = model().predict_proba(&input()).unwrap();
        for row in probs.row_iter() {
            assert_relative_eq!(row.sum(), 1.0, epsilon = 1e-12);
        }
        assert!(probs[(0, 0)] > 0.9);
    }

    #[test]
    fn test_from_parameters() {
        let params = DMatrix::from_row_slice(3, 2, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let m = LinearModel::from_parameters(
            LinearKind::Svm,
            vec![CancerType::KIRC, CancerType::PRAD],
            vec!["g0".into(), "g1".into()],
            &params,
        );
        assert_eq!(m.coefficients[1], vec![2.0, 4.0]);
        assert_eq!(m.intercepts, vec![5.0, 6.0]);
    }

    #[test]
    fn test_argmax_ties_first() {
        assert_eq!(argmax([1.0, 3.0, 3.0].into_iter()), 1);
        assert_eq!(argmax(std::iter::empty()), 0);
    }
}
