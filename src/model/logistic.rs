//! Multinomial logistic regression with L2 penalty and class weights.

use crate::data::{CancerType, ExpressionMatrix};
use crate::error::{BiomarkerError, Result};
use crate::model::linear::{with_bias_column, LinearKind, LinearModel};
use crate::model::optim::{minimize, Objective, OptimizerConfig};
use crate::model::weights::ClassWeights;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Settings for [`model_logistic`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogisticConfig {
    /// Inverse regularization strength.
    pub c: f64,
    /// Weight classes inversely to their frequency.
    pub balanced: bool,
    /// Optimizer stopping rules.
    pub optimizer: OptimizerConfig,
}

impl Default for LogisticConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            balanced: true,
            optimizer: OptimizerConfig {
                max_iter: 1000,
                tol: 1e-6,
            },
        }
    }
}

/// Penalized, weighted softmax cross-entropy.
///
/// `0.5 * ||W||^2 + C * sum_i s_i * (logsumexp(z_i) - z_i[y_i])`, intercepts
/// unpenalized. Parameters are the column-major (p + 1) × k matrix.
struct SoftmaxLoss<'a> {
    x: &'a DMatrix<f64>,
    y: &'a [usize],
    sample_weights: Vec<f64>,
    n_classes: usize,
    c: f64,
}

impl Objective for SoftmaxLoss<'_> {
    fn evaluate(&self, params: &DVector<f64>) -> (f64, DVector<f64>) {
        let n_params = self.x.ncols();
        let b = DMatrix::from_column_slice(n_params, self.n_classes, params.as_slice());
        let z = self.x * &b;

        let mut loss = 0.0;
        let mut residual = DMatrix::zeros(z.nrows(), self.n_classes);
        for i in 0..z.nrows() {
            let row = z.row(i);
            let max = row.max();
            let sum_exp: f64 = row.iter().map(|v| (v - max).exp()).sum();
            let lse = max + sum_exp.ln();
            let s = self.sample_weights[i];
            loss += s * (lse - z[(i, self.y[i])]);
            for c in 0..self.n_classes {
                let p = (z[(i, c)] - lse).exp();
                let target = if c == self.y[i] { 1.0 } else { 0.0 };
                residual[(i, c)] = self.c * s * (p - target);
            }
        }

        let mut grad = self.x.tr_mul(&residual);
        let mut penalty = 0.0;
        for c in 0..self.n_classes {
            for j in 0..n_params - 1 {
                let w = b[(j, c)];
                penalty += w * w;
                grad[(j, c)] += w;
            }
        }

        let value = 0.5 * penalty + self.c * loss;
        (value, DVector::from_column_slice(grad.as_slice()))
    }
}

/// Fit a multinomial logistic regression.
///
/// # Arguments
/// * `x` - Training matrix (samples × features), typically standardized
/// * `y` - Class index per sample into `classes`
/// * `classes` - Class labels, defining the coefficient row order
/// * `config` - Regularization, weighting and optimizer settings
///
/// # Returns
/// A [`LinearModel`] with one coefficient vector per class.
pub fn model_logistic(
    x: &ExpressionMatrix,
    y: &[usize],
    classes: &[CancerType],
    config: &LogisticConfig,
) -> Result<LinearModel> {
    validate_inputs(x, y, classes)?;
    if !(config.c > 0.0) {
        return Err(BiomarkerError::InvalidParameter(format!(
            "C must be positive, got {}",
            config.c
        )));
    }

    let weights = if config.balanced {
        ClassWeights::balanced(y, classes.len())?
    } else {
        ClassWeights::uniform(classes.len())
    };
    let design = with_bias_column(x);
    let objective = SoftmaxLoss {
        x: &design,
        y,
        sample_weights: weights.sample_weights(y),
        n_classes: classes.len(),
        c: config.c,
    };

    let init = DVector::zeros(design.ncols() * classes.len());
    let result = minimize(&objective, init, &config.optimizer)?;
    debug!(
        "logistic regression: {} iterations, objective {:.6}, converged={}",
        result.iterations, result.value, result.converged
    );

    let params = DMatrix::from_column_slice(design.ncols(), classes.len(), result.params.as_slice());
    Ok(LinearModel::from_parameters(
        LinearKind::Logistic,
        classes.to_vec(),
        x.feature_ids().to_vec(),
        &params,
    ))
}

/// Shared argument checks for classifier fitting.
pub(crate) fn validate_inputs(x: &ExpressionMatrix, y: &[usize], classes: &[CancerType]) -> Result<()> {
    if x.n_samples() != y.len() {
        return Err(BiomarkerError::DimensionMismatch {
            expected: x.n_samples(),
            actual: y.len(),
        });
    }
    if x.n_samples() == 0 || x.n_features() == 0 {
        return Err(BiomarkerError::EmptyData("Training matrix is empty".to_string()));
    }
    if classes.len() < 2 {
        return Err(BiomarkerError::InvalidParameter(format!(
            "Need at least 2 classes, got {}",
            classes.len()
        )));
    }
    if let Some(&bad) = y.iter().find(|&&c| c >= classes.len()) {
        return Err(BiomarkerError::InvalidParameter(format!(
            "Class index {} out of range",
            bad
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Three well separated clusters along two informative features.
    fn clusters() -> (ExpressionMatrix, Vec<usize>) {
        let centers = [(2.0, 0.0), (-2.0, 2.0), (0.0, -2.5)];
        let offsets = [(0.1, -0.2), (-0.3, 0.1), (0.2, 0.3), (0.0, -0.1)];
        let mut values = Vec::new();
        let mut y = Vec::new();
        for (c, &(cx, cy)) in centers.iter().enumerate() {
            for &(dx, dy) in &offsets {
                values.extend_from_slice(&[cx + dx, cy + dy, dx * dy]);
                y.push(c);
            }
        }
        let n = y.len();
        let m = ExpressionMatrix::new(
            DMatrix::from_row_slice(n, 3, &values),
            (0..n).map(|i| format!("s{}", i)).collect(),
            (0..3).map(|j| format!("gene_{}", j)).collect(),
        )
        .unwrap();
        (m, y)
    }

    #[test]
    fn test_fits_separable_clusters() {
        let (x, y) = clusters();
        let classes = [CancerType::BRCA, CancerType::KIRC, CancerType::PRAD];
        let model = model_logistic(&x, &y, &classes, &LogisticConfig::default()).unwrap();
        assert_eq!(model.coefficients.len(), 3);
        assert_eq!(model.coefficients[0].len(), 3);
        assert_eq!(model.predict(&x).unwrap(), y);

        // Class 0 sits at large gene_0, so its gene_0 coefficient is the largest.
        assert!(model.coefficients[0][0] > model.coefficients[1][0]);
        assert!(model.coefficients[0][0] > model.coefficients[2][0]);
    }

    #[test]
    fn test_regularization_shrinks() {
        let (x, y) = clusters();
        let classes = [CancerType::BRCA, CancerType::KIRC, CancerType::PRAD];
        let strong = LogisticConfig {
            c: 0.01,
            ..Default::default()
        };
        let weak = model_logistic(&x, &y, &classes, &LogisticConfig::default()).unwrap();
        let shrunk = model_logistic(&x, &y, &classes, &strong).unwrap();
        let norm = |m: &LinearModel| m.coefficients.iter().flatten().map(|v| v * v).sum::<f64>();
        assert!(norm(&shrunk) < norm(&weak));
    }

    #[test]
    fn test_rejects_bad_inputs() {
        let (x, y) = clusters();
        let classes = [CancerType::BRCA, CancerType::KIRC, CancerType::PRAD];
        assert!(model_logistic(&x, &y[..3], &classes, &LogisticConfig::default()).is_err());
        assert!(model_logistic(&x, &y, &classes[..1], &LogisticConfig::default()).is_err());
        let bad_c = LogisticConfig {
            c: 0.0,
            ..Default::default()
        };
        assert!(model_logistic(&x, &y, &classes, &bad_c).is_err());
    }
}
