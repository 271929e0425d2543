//! Per-feature z-score standardization.

use crate::data::ExpressionMatrix;
use crate::error::{BiomarkerError, Result};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Per-feature centering and scaling learned from a reference matrix.
///
/// These parameters are fitted once on the full cleaned corpus and passed
/// explicitly to every consumer that needs to transform new data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingParameters {
    /// Feature identifiers, in column order.
    pub feature_ids: Vec<String>,
    /// Per-feature mean.
    pub means: Vec<f64>,
    /// Per-feature population standard deviation (ddof = 0).
    pub stds: Vec<f64>,
}

impl ScalingParameters {
    /// Learn means and standard deviations from a matrix.
    pub fn fit(matrix: &ExpressionMatrix) -> Result<Self> {
        if matrix.n_samples() == 0 {
            return Err(BiomarkerError::EmptyData(
                "Cannot fit scaling on zero samples".to_string(),
            ));
        }
        let (means, stds) = matrix.column_moments().into_iter().unzip();
        Ok(Self {
            feature_ids: matrix.feature_ids().to_vec(),
            means,
            stds,
        })
    }

    /// Number of features covered.
    pub fn n_features(&self) -> usize {
        self.feature_ids.len()
    }

    /// Divisor used for a feature; constant features are left unscaled.
    #[inline]
    pub fn scale(&self, feature: usize) -> f64 {
        let sd = self.stds[feature];
        if sd > 0.0 {
            sd
        } else {
            1.0
        }
    }

    /// Raw per-feature variances.
    pub fn variances(&self) -> Vec<f64> {
        self.stds.iter().map(|s| s * s).collect()
    }

    /// Apply the learned transformation to a matrix with the same features.
    ///
    /// # Arguments
    /// * `matrix` - Matrix whose feature IDs match the fitted ones, in order
    ///
    /// # Returns
    /// A new matrix with `(x - mean) / sd` per feature.
    pub fn transform(&self, matrix: &ExpressionMatrix) -> Result<ExpressionMatrix> {
        if matrix.n_features() != self.n_features() {
            return Err(BiomarkerError::DimensionMismatch {
                expected: self.n_features(),
                actual: matrix.n_features(),
            });
        }
        if matrix.feature_ids() != self.feature_ids.as_slice() {
            return Err(BiomarkerError::InvalidParameter(
                "Feature IDs differ from those used to fit scaling".to_string(),
            ));
        }
        let data = DMatrix::from_fn(matrix.n_samples(), matrix.n_features(), |i, j| {
            (matrix.get(i, j) - self.means[j]) / self.scale(j)
        });
        matrix.with_data(data)
    }

    /// Restrict the parameters to a subset of features (by index).
    pub fn subset(&self, indices: &[usize]) -> Self {
        Self {
            feature_ids: indices.iter().map(|&j| self.feature_ids[j].clone()).collect(),
            means: indices.iter().map(|&j| self.means[j]).collect(),
            stds: indices.iter().map(|&j| self.stds[j]).collect(),
        }
    }
}

/// Standardize every feature to zero mean and unit variance.
///
/// Uses the population standard deviation. A zero-variance feature is
/// centered but not scaled, so all of its values become 0.
///
/// # Returns
/// The standardized matrix and the fitted parameters.
pub fn norm_zscore(matrix: &ExpressionMatrix) -> Result<(ExpressionMatrix, ScalingParameters)> {
    let params = ScalingParameters::fit(matrix)?;
    let scaled = params.transform(matrix)?;
    Ok((scaled, params))
}
