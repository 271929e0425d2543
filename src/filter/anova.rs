//! One-way ANOVA F-test feature scoring and top-K selection.

use crate::data::artifact::nonfinite_vec;
use crate::data::ExpressionMatrix;
use crate::error::{BiomarkerError, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, FisherSnedecor};

/// ANOVA F statistics for every feature of a matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnovaScores {
    /// F statistic per feature (may be +inf when within-group variance is zero).
    #[serde(with = "nonfinite_vec")]
    pub f_values: Vec<f64>,
    /// Upper-tail p-value per feature.
    pub p_values: Vec<f64>,
    /// Between-group degrees of freedom (k - 1).
    pub df_between: usize,
    /// Within-group degrees of freedom (n - k).
    pub df_within: usize,
}

/// Features retained by selection, best first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSubset {
    /// Retained feature identifiers, in descending score order.
    pub feature_ids: Vec<String>,
    /// Column index of each retained feature in the matrix it was drawn from.
    pub source_indices: Vec<usize>,
    /// Selection score of each retained feature.
    #[serde(with = "nonfinite_vec")]
    pub scores: Vec<f64>,
    /// P-value of each retained feature.
    pub p_values: Vec<f64>,
}

impl FeatureSubset {
    /// Number of retained features.
    pub fn len(&self) -> usize {
        self.feature_ids.len()
    }

    /// Whether no feature was retained.
    pub fn is_empty(&self) -> bool {
        self.feature_ids.is_empty()
    }
}

/// Compute a one-way ANOVA F statistic for each feature.
///
/// # Arguments
/// * `matrix` - Samples × features matrix
/// * `groups` - Group index for each sample (row)
///
/// # Returns
/// F statistics and p-values from the F(k-1, n-k) distribution.
///
/// # Note
/// A feature with zero within- and between-group variance scores 0.
/// A feature with zero within-group variance but group differences scores
/// +inf (p = 0).
pub fn anova_f(matrix: &ExpressionMatrix, groups: &[usize]) -> Result<AnovaScores> {
    let n = matrix.n_samples();
    if groups.len() != n {
        return Err(BiomarkerError::DimensionMismatch {
            expected: n,
            actual: groups.len(),
        });
    }

    let n_slots = groups.iter().copied().max().map_or(0, |g| g + 1);
    let mut group_sizes = vec![0usize; n_slots];
    for &g in groups {
        group_sizes[g] += 1;
    }
    let k = group_sizes.iter().filter(|&&c| c > 0).count();
    if k < 2 {
        return Err(BiomarkerError::InvalidParameter(format!(
            "ANOVA needs at least 2 groups, found {}",
            k
        )));
    }
    if n <= k {
        return Err(BiomarkerError::InvalidParameter(format!(
            "ANOVA needs more samples ({}) than groups ({})",
            n, k
        )));
    }

    let df_between = k - 1;
    let df_within = n - k;
    let dist = FisherSnedecor::new(df_between as f64, df_within as f64)
        .map_err(|e| BiomarkerError::Numerical(format!("F distribution: {}", e)))?;

    let results: Vec<(f64, f64)> = (0..matrix.n_features())
        .into_par_iter()
        .map(|j| {
            let col = matrix.column(j);
            let mut sums = vec![0.0; n_slots];
            for (&x, &g) in col.iter().zip(groups) {
                sums[g] += x;
            }
            let grand_mean = sums.iter().sum::<f64>() / n as f64;
            let means: Vec<f64> = sums
                .iter()
                .zip(&group_sizes)
                .map(|(&s, &c)| if c > 0 { s / c as f64 } else { 0.0 })
                .collect();

            let ss_between: f64 = means
                .iter()
                .zip(&group_sizes)
                .map(|(&m, &c)| c as f64 * (m - grand_mean).powi(2))
                .sum();
            let ss_within: f64 = col
                .iter()
                .zip(groups)
                .map(|(&x, &g)| (x - means[g]).powi(2))
                .sum();

            if ss_within == 0.0 {
                return if ss_between == 0.0 { (0.0, 1.0) } else { (f64::INFINITY, 0.0) };
            }
            let f = (ss_between / df_between as f64) / (ss_within / df_within as f64);
            (f, dist.sf(f))
        })
        .collect();

    let (f_values, p_values) = results.into_iter().unzip();
    Ok(AnovaScores {
        f_values,
        p_values,
        df_between,
        df_within,
    })
}

/// Keep the `k` highest-scoring features.
///
/// Sorting is stable, so features with equal scores keep their original
/// relative order. NaN scores rank last. Requesting more features than
/// exist returns all of them.
///
/// # Arguments
/// * `scores` - ANOVA scores for every column of the scored matrix
/// * `feature_ids` - IDs of the scored matrix's columns
/// * `k` - Number of features to keep (at least 1)
pub fn select_k_best(scores: &AnovaScores, feature_ids: &[String], k: usize) -> Result<FeatureSubset> {
    if k == 0 {
        return Err(BiomarkerError::InvalidParameter(
            "Number of features to select must be at least 1".to_string(),
        ));
    }
    if scores.f_values.len() != feature_ids.len() {
        return Err(BiomarkerError::DimensionMismatch {
            expected: feature_ids.len(),
            actual: scores.f_values.len(),
        });
    }

    let key = |j: usize| {
        let f = scores.f_values[j];
        if f.is_nan() {
            f64::NEG_INFINITY
        } else {
            f
        }
    };
    let mut order: Vec<usize> = (0..feature_ids.len()).collect();
    order.sort_by(|&a, &b| key(b).total_cmp(&key(a)));
    order.truncate(k);

    Ok(FeatureSubset {
        feature_ids: order.iter().map(|&j| feature_ids[j].clone()).collect(),
        scores: order.iter().map(|&j| scores.f_values[j]).collect(),
        p_values: order.iter().map(|&j| scores.p_values[j]).collect(),
        source_indices: order,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|j| format!("gene_{}", j)).collect()
    }

    #[test]
    fn test_anova_known_value() {
        // Groups {1,2,3} and {4,5,6}: SSB = 13.5, SSW = 4, F = 13.5 / (4 / 4) = 13.5
        let m = ExpressionMatrix::new(
            DMatrix::from_column_slice(6, 1, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
            (0..6).map(|i| format!("s{}", i)).collect(),
            ids(1),
        )
        .unwrap();
        let scores = anova_f(&m, &[0, 0, 0, 1, 1, 1]).unwrap();
        assert_relative_eq!(scores.f_values[0], 13.5, epsilon = 1e-10);
        assert_eq!(scores.df_between, 1);
        assert_eq!(scores.df_within, 4);
        assert!(scores.p_values[0] > 0.01 && scores.p_values[0] < 0.05);
    }

    #[test]
    fn test_anova_degenerate_features() {
        let m = ExpressionMatrix::new(
            DMatrix::from_column_slice(4, 2, &[1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 2.0, 2.0]),
            (0..4).map(|i| format!("s{}", i)).collect(),
            ids(2),
        )
        .unwrap();
        let scores = anova_f(&m, &[0, 0, 1, 1]).unwrap();
        assert_eq!(scores.f_values[0], 0.0);
        assert_eq!(scores.f_values[1], f64::INFINITY);
        assert_eq!(scores.p_values[1], 0.0);
    }

    #[test]
    fn test_anova_requires_two_groups() {
        let m = ExpressionMatrix::new(
            DMatrix::zeros(3, 1),
            (0..3).map(|i| format!("s{}", i)).collect(),
            ids(1),
        )
        .unwrap();
        assert!(anova_f(&m, &[0, 0, 0]).is_err());
        assert!(anova_f(&m, &[0, 1, 2]).is_err());
        assert!(anova_f(&m, &[0, 1]).is_err());
    }

    fn scores(f: Vec<f64>) -> AnovaScores {
        let p = vec![0.5; f.len()];
        AnovaScores {
            f_values: f,
            p_values: p,
            df_between: 1,
            df_within: 1,
        }
    }

    #[test]
    fn test_select_k_best_descending_and_stable() {
        let s = scores(vec![2.0, 5.0, 2.0, f64::NAN, 9.0, 2.0]);
        let subset = select_k_best(&s, &ids(6), 4).unwrap();
        assert_eq!(subset.len(), 4);
        assert_eq!(subset.source_indices, vec![4, 1, 0, 2]);
        assert_eq!(subset.feature_ids[0], "gene_4");
        assert!(subset.scores.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_select_k_larger_than_available() {
        let s = scores(vec![1.0, 3.0]);
        let subset = select_k_best(&s, &ids(2), 1000).unwrap();
        assert_eq!(subset.source_indices, vec![1, 0]);
        assert!(select_k_best(&s, &ids(2), 0).is_err());
    }

    #[test]
    fn test_subset_json_with_infinite_score() {
        let s = scores(vec![f64::INFINITY, 3.0]);
        let subset = select_k_best(&s, &ids(2), 2).unwrap();
        let json = serde_json::to_string(&subset).unwrap();
        let back: FeatureSubset = serde_json::from_str(&json).unwrap();
        assert_eq!(back, subset);
    }
}
