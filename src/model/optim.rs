//! Gradient descent with Barzilai-Borwein steps and Armijo backtracking.
//!
//! Shared by the linear classifiers. Each iteration proposes a step length
//! from the last two iterates, then halves it until the sufficient-decrease
//! condition holds, so every accepted step lowers the objective.

use crate::error::{BiomarkerError, Result};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Armijo sufficient-decrease constant.
const ARMIJO_C1: f64 = 1e-4;
/// Smallest step tried before giving up on a direction.
const MIN_STEP: f64 = 1e-16;
const MAX_STEP: f64 = 1e10;
/// Relative objective change treated as stalled.
const REL_STALL: f64 = 1e-12;

/// Stopping rules for [`minimize`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Maximum number of iterations.
    pub max_iter: usize,
    /// Stop when the largest gradient component falls below this.
    pub tol: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_iter: 500,
            tol: 1e-6,
        }
    }
}

/// A differentiable function to minimize.
pub trait Objective {
    /// Objective value and gradient at `params`.
    fn evaluate(&self, params: &DVector<f64>) -> (f64, DVector<f64>);
}

/// Outcome of a minimization.
#[derive(Debug, Clone)]
pub struct OptimResult {
    /// Final parameters.
    pub params: DVector<f64>,
    /// Objective value at `params`.
    pub value: f64,
    /// Iterations performed.
    pub iterations: usize,
    /// Whether a stopping tolerance was reached before `max_iter`.
    pub converged: bool,
}

/// Minimize an objective starting from `init`.
pub fn minimize<O: Objective>(
    objective: &O,
    init: DVector<f64>,
    config: &OptimizerConfig,
) -> Result<OptimResult> {
    let mut x = init;
    let (mut f, mut g) = objective.evaluate(&x);
    if !f.is_finite() {
        return Err(BiomarkerError::Numerical(
            "Objective is not finite at the starting point".to_string(),
        ));
    }

    let g_norm = g.amax();
    let mut step = if g_norm > 0.0 { 1.0 / g_norm } else { 1.0 };
    let mut converged = false;
    let mut iterations = 0;

    while iterations < config.max_iter {
        if g.amax() < config.tol {
            converged = true;
            break;
        }
        iterations += 1;

        let g_sq = g.norm_squared();
        let mut t = step;
        let accepted = loop {
            let candidate = &x - &g * t;
            let (fc, gc) = objective.evaluate(&candidate);
            if fc.is_finite() && fc <= f - ARMIJO_C1 * t * g_sq {
                break Some((candidate, fc, gc));
            }
            t *= 0.5;
            if t < MIN_STEP {
                break None;
            }
        };
        let Some((x_new, f_new, g_new)) = accepted else {
            warn!(
                "line search stalled after {} iterations (gradient max {:.3e})",
                iterations,
                g.amax()
            );
            return Ok(OptimResult {
                params: x,
                value: f,
                iterations,
                converged: false,
            });
        };

        let s = &x_new - &x;
        let y = &g_new - &g;
        let sy = s.dot(&y);
        step = if sy > 0.0 {
            (s.norm_squared() / sy).clamp(MIN_STEP, MAX_STEP)
        } else {
            (t * 2.0).min(MAX_STEP)
        };

        let stalled = (f - f_new).abs() <= REL_STALL * f.abs().max(1.0);
        x = x_new;
        f = f_new;
        g = g_new;
        if stalled {
            converged = true;
            break;
        }
    }

    if !converged {
        warn!(
            "optimizer reached max_iter={} (gradient max {:.3e})",
            config.max_iter,
            g.amax()
        );
    }
    Ok(OptimResult {
        params: x,
        value: f,
        iterations,
        converged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// f(x) = sum_i a_i (x_i - b_i)^2
    struct Quadratic {
        a: Vec<f64>,
        b: Vec<f64>,
    }

    impl Objective for Quadratic {
        fn evaluate(&self, x: &DVector<f64>) -> (f64, DVector<f64>) {
            let mut f = 0.0;
            let mut g = DVector::zeros(x.len());
            for i in 0..x.len() {
                let d = x[i] - self.b[i];
                f += self.a[i] * d * d;
                g[i] = 2.0 * self.a[i] * d;
            }
            (f, g)
        }
    }

    #[test]
    fn test_minimize_ill_conditioned_quadratic() {
        let q = Quadratic {
            a: vec![1.0, 100.0, 0.01],
            b: vec![3.0, -2.0, 5.0],
        };
        let config = OptimizerConfig {
            max_iter: 5000,
            tol: 1e-9,
        };
        let result = minimize(&q, DVector::zeros(3), &config).unwrap();
        assert!(result.converged);
        assert_relative_eq!(result.params[0], 3.0, epsilon = 1e-5);
        assert_relative_eq!(result.params[1], -2.0, epsilon = 1e-5);
        assert_relative_eq!(result.params[2], 5.0, epsilon = 1e-3);
    }

    #[test]
    fn test_already_optimal() {
        let q = Quadratic {
            a: vec![1.0],
            b: vec![0.0],
        };
        let result = minimize(&q, DVector::zeros(1), &OptimizerConfig::default()).unwrap();
        assert_eq!(result.iterations, 0);
        assert!(result.converged);
    }

    /// Reports a descent direction that never lowers the value.
    struct Uphill;

    impl Objective for Uphill {
        fn evaluate(&self, x: &DVector<f64>) -> (f64, DVector<f64>) {
            (x[0], DVector::from_element(1, -1.0))
        }
    }

    #[test]
    fn test_stalled_line_search_not_converged() {
        let result = minimize(&Uphill, DVector::zeros(1), &OptimizerConfig::default()).unwrap();
        assert!(!result.converged);
        assert_eq!(result.iterations, 1);
        assert_eq!(result.params[0], 0.0);
    }
}
