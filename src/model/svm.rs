//! One-vs-rest linear SVM with squared hinge loss.
//!
//! Each binary problem minimizes
//! `0.5 * ||w||^2 + C * sum_i s_i * max(0, 1 - y_i * (w'x_i + b))^2`
//! with `y_i` in {-1, +1} and per-sample class weights `s_i`.

use crate::data::{CancerType, ExpressionMatrix};
use crate::error::{BiomarkerError, Result};
use crate::model::linear::{with_bias_column, LinearKind, LinearModel};
use crate::model::logistic::validate_inputs;
use crate::model::optim::{minimize, Objective, OptimizerConfig};
use crate::model::weights::ClassWeights;
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Settings for [`model_svm`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SvmConfig {
    /// Misclassification cost.
    pub c: f64,
    /// Weight classes inversely to their frequency.
    pub balanced: bool,
    /// Optimizer stopping rules.
    pub optimizer: OptimizerConfig,
}

impl Default for SvmConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            balanced: true,
            optimizer: OptimizerConfig {
                max_iter: 1000,
                tol: 1e-5,
            },
        }
    }
}

struct SquaredHinge<'a> {
    x: &'a DMatrix<f64>,
    signs: Vec<f64>,
    costs: Vec<f64>,
}

impl Objective for SquaredHinge<'_> {
    fn evaluate(&self, w: &DVector<f64>) -> (f64, DVector<f64>) {
        let n_params = w.len();
        let outputs = self.x * w;

        let mut loss = 0.0;
        let mut residual = DVector::zeros(outputs.len());
        for i in 0..outputs.len() {
            let margin = 1.0 - self.signs[i] * outputs[i];
            if margin > 0.0 {
                loss += self.costs[i] * margin * margin;
                residual[i] = -2.0 * self.costs[i] * self.signs[i] * margin;
            }
        }

        let mut grad = self.x.tr_mul(&residual);
        let mut penalty = 0.0;
        for j in 0..n_params - 1 {
            penalty += w[j] * w[j];
            grad[j] += w[j];
        }
        (0.5 * penalty + loss, grad)
    }
}

/// Fit a one-vs-rest linear SVM.
///
/// Binary problems are independent and are solved in parallel.
///
/// # Arguments
/// * `x` - Training matrix (samples × features)
/// * `y` - Class index per sample into `classes`
/// * `classes` - Class labels, defining the coefficient row order
/// * `config` - Cost, weighting and optimizer settings
pub fn model_svm(
    x: &ExpressionMatrix,
    y: &[usize],
    classes: &[CancerType],
    config: &SvmConfig,
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
    let costs: Vec<f64> = weights
        .sample_weights(y)
        .into_iter()
        .map(|s| s * config.c)
        .collect();
    let design = with_bias_column(x);

    let columns: Vec<DVector<f64>> = (0..classes.len())
        .into_par_iter()
        .map(|class| {
            let objective = SquaredHinge {
                x: &design,
                signs: y.iter().map(|&c| if c == class { 1.0 } else { -1.0 }).collect(),
                costs: costs.clone(),
            };
            let result = minimize(&objective, DVector::zeros(design.ncols()), &config.optimizer)?;
            debug!(
                "svm class {}: {} iterations, objective {:.6}",
                classes[class], result.iterations, result.value
            );
            Ok(result.params)
        })
        .collect::<Result<Vec<_>>>()?;

    let params = DMatrix::from_columns(&columns);
    Ok(LinearModel::from_parameters(
        LinearKind::Svm,
        classes.to_vec(),
        x.feature_ids().to_vec(),
        &params,
    ))
}
