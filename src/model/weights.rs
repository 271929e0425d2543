//! Class weights for imbalanced training data.

use crate::error::{BiomarkerError, Result};
use serde::{Deserialize, Serialize};

/// Per-class sample weights, indexed like the model's class list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassWeights {
    /// Weight for each class index.
    pub weights: Vec<f64>,
}

impl ClassWeights {
    /// Every class weighted 1.
    pub fn uniform(n_classes: usize) -> Self {
        Self {
            weights: vec![1.0; n_classes],
        }
    }

    /// Weights inversely proportional to class frequency.
    ///
    /// `w_c = n / (k * n_c)`, so the total weight of each class is `n / k`.
    ///
    /// # Arguments
    /// * `y` - Encoded class index per sample
    /// * `n_classes` - Number of classes (k)
    pub fn balanced(y: &[usize], n_classes: usize) -> Result<Self> {
        let mut counts = vec![0usize; n_classes];
        for &c in y {
            if c >= n_classes {
                return Err(BiomarkerError::InvalidParameter(format!(
                    "Class index {} out of range for {} classes",
                    c, n_classes
                )));
            }
            counts[c] += 1;
        }
        if let Some(missing) = counts.iter().position(|&c| c == 0) {
            return Err(BiomarkerError::InvalidParameter(format!(
                "Class {} has no training samples",
                missing
            )));
        }
        let n = y.len() as f64;
        let k = n_classes as f64;
        Ok(Self {
            weights: counts.iter().map(|&c| n / (k * c as f64)).collect(),
        })
    }

    /// Weight of each sample given its class.
    pub fn sample_weights(&self, y: &[usize]) -> Vec<f64> {
        y.iter().map(|&c| self.weights[c]).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_balanced() {
        let y = [0, 0, 0, 1];
        let w = ClassWeights::balanced(&y, 2).unwrap();
        assert_relative_eq!(w.weights[0], 4.0 / 6.0);
        assert_relative_eq!(w.weights[1], 2.0);
        let total: f64 = w.sample_weights(&y).iter().sum();
        assert_relative_eq!(total, 4.0);
    }

    #[test]
    fn test_empty_class_rejected() {
        assert!(ClassWeights::balanced(&[0, 0], 2).is_err());
        assert!(ClassWeights::balanced(&[0, 3], 2).is_err());
    }
}
