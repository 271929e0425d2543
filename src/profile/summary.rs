//! Descriptive summary of an expression dataset.

use crate::data::{CancerType, ExpressionMatrix, LabelVector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Shape, class balance and value range of a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSummary {
    /// Number of samples.
    pub n_samples: usize,
    /// Number of features.
    pub n_features: usize,
    /// Samples per class.
    pub class_distribution: BTreeMap<CancerType, usize>,
    /// Percentage of samples per class.
    pub class_percentages: BTreeMap<CancerType, f64>,
    /// Smallest observed value.
    pub min: f64,
    /// Largest observed value.
    pub max: f64,
    /// Mean of all observed values.
    pub mean: f64,
    /// Population standard deviation of all observed values.
    pub std: f64,
    /// Approximate size of the value buffer in megabytes.
    pub memory_mb: f64,
}

impl DataSummary {
    /// Ratio of the largest to the smallest class.
    pub fn imbalance_ratio(&self) -> f64 {
        let max = self.class_distribution.values().copied().max().unwrap_or(0);
        let min = self.class_distribution.values().copied().min().unwrap_or(0);
        if min == 0 {
            f64::INFINITY
        } else {
            max as f64 / min as f64
        }
    }
}

impl std::fmt::Display for DataSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Data Summary")?;
        writeln!(f, "  Samples:   {}", self.n_samples)?;
        writeln!(f, "  Features:  {}", self.n_features)?;
        writeln!(f, "  Memory:    {:.2} MB", self.memory_mb)?;
        writeln!(f, "  Value range: [{:.4}, {:.4}]", self.min, self.max)?;
        writeln!(f, "  Mean: {:.4}  Std: {:.4}", self.mean, self.std)?;
        writeln!(f, "  Class distribution:")?;
        for (class, count) in &self.class_distribution {
            let pct = self.class_percentages.get(class).copied().unwrap_or(0.0);
            writeln!(f, "    {:<5} {:>5} ({:.1}%)", class, count, pct)?;
        }
        writeln!(f, "  Imbalance ratio: {:.2}", self.imbalance_ratio())?;
        Ok(())
    }
}

/// Summarize a dataset. Missing (NaN) values are ignored in the statistics.
pub fn profile_summary(matrix: &ExpressionMatrix, labels: &LabelVector) -> DataSummary {
    let values = matrix.data().as_slice();
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0;
    let mut n = 0usize;
    for &v in values.iter().filter(|v| !v.is_nan()) {
        min = min.min(v);
        max = max.max(v);
        sum += v;
        n += 1;
    }
    let mean = if n > 0 { sum / n as f64 } else { f64::NAN };
    let var = if n > 0 {
        values
            .iter()
            .filter(|v| !v.is_nan())
            .map(|v| (v - mean).powi(2))
            .sum::<f64>()
            / n as f64
    } else {
        f64::NAN
    };

    let class_distribution = labels.class_counts();
    let total = labels.len().max(1) as f64;
    let class_percentages = class_distribution
        .iter()
        .map(|(&c, &count)| (c, count as f64 / total * 100.0))
        .collect();

    DataSummary {
        n_samples: matrix.n_samples(),
        n_features: matrix.n_features(),
        class_distribution,
        class_percentages,
        min,
        max,
        mean,
        std: var.sqrt(),
        memory_mb: (values.len() * std::mem::size_of::<f64>()) as f64 / (1024.0 * 1024.0),
    }
}
