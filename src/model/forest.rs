//! Random forest of CART classification trees.
//!
//! Each tree is grown on a bootstrap sample with weighted Gini impurity and
//! a random subset of features per split. Leaves keep the weighted class
//! distribution, and the forest averages those distributions.

use crate::data::{CancerType, ExpressionMatrix};
use crate::error::{BiomarkerError, Result};
use crate::model::linear::argmax;
use crate::model::logistic::validate_inputs;
use crate::model::weights::ClassWeights;
use nalgebra::DMatrix;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Settings for [`model_forest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    /// Number of trees.
    pub n_trees: usize,
    /// Maximum tree depth (unlimited if `None`).
    pub max_depth: Option<usize>,
    /// Minimum number of distinct samples in each leaf.
    pub min_samples_leaf: usize,
    /// Features tried per split (`None` = square root of the feature count).
    pub max_features: Option<usize>,
    /// Weight classes inversely to their frequency.
    pub balanced: bool,
    /// Base seed; tree `t` uses `seed + t`. `None` falls back to
    /// [`DEFAULT_FOREST_SEED`], or to the training seed inside a pipeline.
    pub seed: Option<u64>,
}

/// Base seed used when none is configured.
pub const DEFAULT_FOREST_SEED: u64 = 42;

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            min_samples_leaf: 1,
            max_features: None,
            balanced: true,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        /// Weighted class proportions.
        distribution: Vec<f64>,
    },
}

/// A single classification tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Class distribution of the leaf reached by one sample.
    fn leaf_distribution(&self, x: &DMatrix<f64>, row: usize) -> &[f64] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { distribution } => return distribution,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if x[(row, *feature)] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    /// Number of nodes.
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }
}

/// A trained random forest classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    /// Class labels, in probability column order.
    pub classes: Vec<CancerType>,
    /// Feature identifiers, in column order.
    pub feature_ids: Vec<String>,
    /// Fitted trees.
    pub trees: Vec<DecisionTree>,
    /// Mean decrease in impurity per feature, summing to 1.
    pub feature_importances: Vec<f64>,
}

impl RandomForest {
    /// Number of features.
    pub fn n_features(&self) -> usize {
        self.feature_ids.len()
    }

    /// Averaged leaf distributions (samples × classes).
    pub fn predict_proba(&self, x: &ExpressionMatrix) -> Result<DMatrix<f64>> {
        if x.n_features() != self.n_features() {
            return Err(BiomarkerError::DimensionMismatch {
                expected: self.n_features(),
                actual: x.n_features(),
            });
        }
        let data = x.data();
        let k = self.classes.len();
        let mut probs = DMatrix::zeros(x.n_samples(), k);
        for tree in &self.trees {
            for i in 0..x.n_samples() {
                let dist = tree.leaf_distribution(data, i);
                for c in 0..k {
                    probs[(i, c)] += dist[c];
                }
            }
        }
        let n_trees = self.trees.len().max(1) as f64;
        probs /= n_trees;
        Ok(probs)
    }

    /// Predicted class index for each sample.
    pub fn predict(&self, x: &ExpressionMatrix) -> Result<Vec<usize>> {
        let probs = self.predict_proba(x)?;
        Ok(probs.row_iter().map(|row| argmax(row.iter().copied())).collect())
    }
}

/// Inputs shared by every node while growing one tree.
struct TreeContext<'a> {
    x: &'a DMatrix<f64>,
    y: &'a [usize],
    weights: &'a [f64],
    n_classes: usize,
    max_depth: usize,
    min_samples_leaf: usize,
    max_features: usize,
}

/// Fit a random forest classifier.
///
/// # Arguments
/// * `x` - Training matrix (samples × features)
/// * `y` - Class index per sample into `classes`
/// * `classes` - Class labels
/// * `config` - Forest settings
pub fn model_forest(
    x: &ExpressionMatrix,
    y: &[usize],
    classes: &[CancerType],
    config: &ForestConfig,
) -> Result<RandomForest> {
    validate_inputs(x, y, classes)?;
    if config.n_trees == 0 {
        return Err(BiomarkerError::InvalidParameter(
            "Forest needs at least one tree".to_string(),
        ));
    }

    let n = x.n_samples();
    let p = x.n_features();
    let max_features = config
        .max_features
        .unwrap_or_else(|| ((p as f64).sqrt().round() as usize).max(1))
        .clamp(1, p);
    let class_weights = if config.balanced {
        ClassWeights::balanced(y, classes.len())?
    } else {
        ClassWeights::uniform(classes.len())
    };

    let base_seed = config.seed.unwrap_or(DEFAULT_FOREST_SEED);
    let fitted: Vec<(DecisionTree, Vec<f64>)> = (0..config.n_trees)
        .into_par_iter()
        .map(|t| {
            let mut rng = ChaCha8Rng::seed_from_u64(base_seed.wrapping_add(t as u64));

            let mut counts = vec![0usize; n];
            for _ in 0..n {
                counts[rng.random_range(0..n)] += 1;
            }
            let weights: Vec<f64> = counts
                .iter()
                .zip(y)
                .map(|(&c, &label)| c as f64 * class_weights.weights[label])
                .collect();
            let indices: Vec<usize> = (0..n).filter(|&i| counts[i] > 0).collect();

            let ctx = TreeContext {
                x: x.data(),
                y,
                weights: &weights,
                n_classes: classes.len(),
                max_depth: config.max_depth.unwrap_or(usize::MAX),
                min_samples_leaf: config.min_samples_leaf.max(1),
                max_features,
            };
            let mut nodes = Vec::new();
            let mut importances = vec![0.0; p];
            build_tree(&ctx, &indices, 0, &mut rng, &mut nodes, &mut importances);
            (DecisionTree { nodes }, importances)
        })
        .collect();

    let mut feature_importances = vec![0.0; p];
    let mut trees = Vec::with_capacity(fitted.len());
    for (tree, importances) in fitted {
        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for (acc, v) in feature_importances.iter_mut().zip(&importances) {
                *acc += v / total;
            }
        }
        trees.push(tree);
    }
    let total: f64 = feature_importances.iter().sum();
    if total > 0.0 {
        feature_importances.iter_mut().for_each(|v| *v /= total);
    }

    debug!(
        "random forest: {} trees, mean {:.1} nodes",
        trees.len(),
        trees.iter().map(|t| t.n_nodes()).sum::<usize>() as f64 / trees.len() as f64
    );

    Ok(RandomForest {
        classes: classes.to_vec(),
        feature_ids: x.feature_ids().to_vec(),
        trees,
        feature_importances,
    })
}

fn class_totals(ctx: &TreeContext<'_>, indices: &[usize]) -> Vec<f64> {
    let mut totals = vec![0.0; ctx.n_classes];
    for &i in indices {
        totals[ctx.y[i]] += ctx.weights[i];
    }
    totals
}

/// Gini impurity scaled by total weight: `W * (1 - sum_c (w_c / W)^2)`.
fn weighted_gini(totals: &[f64]) -> f64 {
    let w: f64 = totals.iter().sum();
    if w <= 0.0 {
        return 0.0;
    }
    w - totals.iter().map(|t| t * t).sum::<f64>() / w
}

fn push_leaf(nodes: &mut Vec<TreeNode>, totals: &[f64]) -> usize {
    let w: f64 = totals.iter().sum();
    let distribution = if w > 0.0 {
        totals.iter().map(|t| t / w).collect()
    } else {
        vec![1.0 / totals.len() as f64; totals.len()]
    };
    nodes.push(TreeNode::Leaf { distribution });
    nodes.len() - 1
}

fn build_tree(
    ctx: &TreeContext<'_>,
    indices: &[usize],
    depth: usize,
    rng: &mut ChaCha8Rng,
    nodes: &mut Vec<TreeNode>,
    importances: &mut [f64],
) -> usize {
    let totals = class_totals(ctx, indices);
    let pure = totals.iter().filter(|&&t| t > 0.0).count() <= 1;
    if pure || depth >= ctx.max_depth || indices.len() < 2 * ctx.min_samples_leaf {
        return push_leaf(nodes, &totals);
    }

    let Some((feature, threshold, decrease)) = find_best_split(ctx, indices, &totals, rng) else {
        return push_leaf(nodes, &totals);
    };
    let (left_indices, right_indices) = partition(ctx.x, indices, feature, threshold);
    if left_indices.is_empty() || right_indices.is_empty() {
        return push_leaf(nodes, &totals);
    }
    importances[feature] += decrease;

    let node_idx = nodes.len();
    nodes.push(TreeNode::Leaf {
        distribution: Vec::new(),
    }); // placeholder

    let left = build_tree(ctx, &left_indices, depth + 1, rng, nodes, importances);
    let right = build_tree(ctx, &right_indices, depth + 1, rng, nodes, importances);
    nodes[node_idx] = TreeNode::Split {
        feature,
        threshold,
        left,
        right,
    };
    node_idx
}

/// Best (feature, threshold, impurity decrease) among a random feature subset.
fn find_best_split(
    ctx: &TreeContext<'_>,
    indices: &[usize],
    totals: &[f64],
    rng: &mut ChaCha8Rng,
) -> Option<(usize, f64, f64)> {
    let parent = weighted_gini(totals);
    let n = indices.len();
    let candidates = rand::seq::index::sample(rng, ctx.x.ncols(), ctx.max_features).into_vec();

    let mut best: Option<(usize, f64, f64)> = None;
    let mut left = vec![0.0; ctx.n_classes];
    let mut right = vec![0.0; ctx.n_classes];
    for feature in candidates {
        let mut pairs: Vec<(f64, usize)> = indices.iter().map(|&i| (ctx.x[(i, feature)], i)).collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

        left.iter_mut().for_each(|v| *v = 0.0);
        right.copy_from_slice(totals);
        for pos in 0..n - 1 {
            let i = pairs[pos].1;
            left[ctx.y[i]] += ctx.weights[i];
            right[ctx.y[i]] -= ctx.weights[i];

            if pairs[pos].0 == pairs[pos + 1].0 {
                continue;
            }
            let n_left = pos + 1;
            if n_left < ctx.min_samples_leaf || n - n_left < ctx.min_samples_leaf {
                continue;
            }

            let decrease = parent - weighted_gini(&left) - weighted_gini(&right);
            if decrease > best.map_or(1e-12, |b| b.2) {
                let threshold = pairs[pos].0 + (pairs[pos + 1].0 - pairs[pos].0) / 2.0;
                best = Some((feature, threshold, decrease));
            }
        }
    }
    best
}

fn partition(x: &DMatrix<f64>, indices: &[usize], feature: usize, threshold: f64) -> (Vec<usize>, Vec<usize>) {
    indices.iter().copied().partition(|&i| x[(i, feature)] <= threshold)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interval_classes() -> (ExpressionMatrix, Vec<usize>) {
        // Class 1 at both extremes of gene_0, class 0 in the middle; gene_1 and
        // gene_2 are noise. No single linear boundary separates the classes.
        let mut values = Vec::new();
        let mut y = Vec::new();
        for i in 0..40 {
            values.extend_from_slice(&[i as f64, ((i * 7) % 11) as f64, (i % 7) as f64]);
            y.push(if i < 10 || i >= 30 { 1 } else { 0 });
        }
        let x = ExpressionMatrix::new(
            DMatrix::from_row_slice(40, 3, &values),
            (0..40).map(|i| format!("s{}", i)).collect(),
            (0..3).map(|j| format!("gene_{}", j)).collect(),
        )
        .unwrap();
        (x, y)
    }

    #[test]
    fn test_learns_nonlinear_boundary() {
        let (x, y) = interval_classes();
        let config = ForestConfig {
            n_trees: 50,
            max_features: Some(2),
            ..Default::default()
        };
        let forest = model_forest(&x, &y, &[CancerType::BRCA, CancerType::COAD], &config).unwrap();
        let pred = forest.predict(&x).unwrap();
        let correct = pred.iter().zip(&y).filter(|(a, b)| a == b).count();
        assert!(correct >= 38, "only {} of 40 correct", correct);
        assert!(forest.feature_importances[2] < forest.feature_importances[0]);
        let total: f64 = forest.feature_importances.iter().sum();
        approx::assert_relative_eq!(total, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_deterministic_with_seed() {
        let (x, y) = interval_classes();
        let config = ForestConfig {
            n_trees: 10,
            ..Default::default()
        };
        let classes = [CancerType::BRCA, CancerType::COAD];
        let a = model_forest(&x, &y, &classes, &config).unwrap();
        let b = model_forest(&x, &y, &classes, &config).unwrap();
        assert_eq!(a, b);

        let explicit = ForestConfig {
            seed: Some(DEFAULT_FOREST_SEED),
            ..config.clone()
        };
        assert_eq!(model_forest(&x, &y, &classes, &explicit).unwrap(), a);
    }

    #[test]
    fn test_proba_rows_sum_to_one() {
        let (x, y) = interval_classes();
        let config = ForestConfig {
            n_trees: 5,
            max_depth: Some(1),
            ..Default::default()
        };
        let forest = model_forest(&x, &y, &[CancerType::BRCA, CancerType::COAD], &config).unwrap();
        let probs = forest.predict_proba(&x).unwrap();
        for row in probs.row_iter() {
            approx::assert_relative_eq!(row.sum(), 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_zero_trees_rejected() {
        let (x, y) = interval_classes();
        let config = ForestConfig {
            n_trees: 0,
            ..Default::default()
        };
        assert!(model_forest(&x, &y, &[CancerType::BRCA, CancerType::COAD], &config).is_err());
    }
}
