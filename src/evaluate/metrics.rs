//! Classification metrics: confusion matrix, accuracy, precision, recall, F1.

use crate::data::CancerType;
use crate::error::{BiomarkerError, Result};
use serde::{Deserialize, Serialize};

/// Counts of (true class, predicted class) pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    /// `counts[t][p]` = samples of true class `t` predicted as `p`.
    pub counts: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    /// Tabulate predictions against ground truth.
    pub fn from_predictions(y_true: &[usize], y_pred: &[usize], n_classes: usize) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            return Err(BiomarkerError::DimensionMismatch {
                expected: y_true.len(),
                actual: y_pred.len(),
            });
        }
        let mut counts = vec![vec![0usize; n_classes]; n_classes];
        for (&t, &p) in y_true.iter().zip(y_pred) {
            if t >= n_classes || p >= n_classes {
                return Err(BiomarkerError::InvalidParameter(format!(
                    "Class index out of range for {} classes",
                    n_classes
                )));
            }
            counts[t][p] += 1;
        }
        Ok(Self { counts })
    }

    /// Number of classes.
    pub fn n_classes(&self) -> usize {
        self.counts.len()
    }

    /// Total number of samples.
    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    /// True positives for a class.
    pub fn true_positives(&self, class: usize) -> usize {
        self.counts[class][class]
    }

    /// False positives for a class (predicted as `class`, truly another).
    pub fn false_positives(&self, class: usize) -> usize {
        (0..self.n_classes())
            .filter(|&t| t != class)
            .map(|t| self.counts[t][class])
            .sum()
    }

    /// False negatives for a class (truly `class`, predicted as another).
    pub fn false_negatives(&self, class: usize) -> usize {
        (0..self.n_classes())
            .filter(|&p| p != class)
            .map(|p| self.counts[class][p])
            .sum()
    }

    /// Number of samples whose true class is `class`.
    pub fn support(&self, class: usize) -> usize {
        self.counts[class].iter().sum()
    }

    /// Fraction of samples on the diagonal.
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let correct: usize = (0..self.n_classes()).map(|c| self.counts[c][c]).sum();
        correct as f64 / total as f64
    }

    /// TP / (TP + FP), or 0 when nothing was predicted as `class`.
    pub fn precision(&self, class: usize) -> f64 {
        ratio(self.true_positives(class), self.true_positives(class) + self.false_positives(class))
    }

    /// TP / (TP + FN), or 0 when `class` never occurs.
    pub fn recall(&self, class: usize) -> f64 {
        ratio(self.true_positives(class), self.true_positives(class) + self.false_negatives(class))
    }

    /// Harmonic mean of precision and recall.
    pub fn f1(&self, class: usize) -> f64 {
        let tp = self.true_positives(class);
        let denom = 2 * tp + self.false_positives(class) + self.false_negatives(class);
        ratio(2 * tp, denom)
    }

    /// Whether a class appears in either the truth or the predictions.
    pub fn is_observed(&self, class: usize) -> bool {
        self.true_positives(class) + self.false_positives(class) + self.false_negatives(class) > 0
    }

    /// Unweighted mean of per-class F1 over observed classes.
    pub fn macro_f1(&self) -> f64 {
        let observed: Vec<usize> = (0..self.n_classes()).filter(|&c| self.is_observed(c)).collect();
        if observed.is_empty() {
            return 0.0;
        }
        observed.iter().map(|&c| self.f1(c)).sum::<f64>() / observed.len() as f64
    }

    /// Support-weighted mean of per-class F1.
    pub fn weighted_f1(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (0..self.n_classes())
            .map(|c| self.f1(c) * self.support(c) as f64)
            .sum::<f64>()
            / total as f64
    }
}

fn ratio(num: usize, denom: usize) -> f64 {
    if denom == 0 {
        0.0
    } else {
        num as f64 / denom as f64
    }
}

/// Metrics for one class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    /// Class label.
    pub class: CancerType,
    /// Precision.
    pub precision: f64,
    /// Recall.
    pub recall: f64,
    /// F1 score.
    pub f1: f64,
    /// Number of true samples of this class.
    pub support: usize,
}

/// Per-class and aggregate metrics for a set of predictions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    /// Per-class metrics, in class order.
    pub per_class: Vec<ClassMetrics>,
    /// Overall accuracy.
    pub accuracy: f64,
    /// Unweighted mean F1.
    pub macro_f1: f64,
    /// Support-weighted mean F1.
    pub weighted_f1: f64,
    /// Underlying confusion matrix.
    pub confusion: ConfusionMatrix,
}

impl std::fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{:<8} {:>9} {:>9} {:>9} {:>8}", "class", "precision", "recall", "f1", "support")?;
        for m in &self.per_class {
            writeln!(
                f,
                "{:<8} {:>9.4} {:>9.4} {:>9.4} {:>8}",
                m.class, m.precision, m.recall, m.f1, m.support
            )?;
        }
        writeln!(f, "accuracy    {:.4}", self.accuracy)?;
        writeln!(f, "macro F1    {:.4}", self.macro_f1)?;
        writeln!(f, "weighted F1 {:.4}", self.weighted_f1)?;
        Ok(())
    }
}

/// Build a full report for encoded predictions.
///
/// # Arguments
/// * `y_true` - True class indices into `classes`
/// * `y_pred` - Predicted class indices into `classes`
/// * `classes` - Class labels
pub fn classification_report(
    y_true: &[usize],
    y_pred: &[usize],
    classes: &[CancerType],
) -> Result<ClassificationReport> {
    let confusion = ConfusionMatrix::from_predictions(y_true, y_pred, classes.len())?;
    let per_class = classes
        .iter()
        .enumerate()
        .map(|(c, &class)| ClassMetrics {
            class,
            precision: confusion.precision(c),
            recall: confusion.recall(c),
            f1: confusion.f1(c),
            support: confusion.support(c),
        })
        .collect();
    Ok(ClassificationReport {
        per_class,
        accuracy: confusion.accuracy(),
        macro_f1: confusion.macro_f1(),
        weighted_f1: confusion.weighted_f1(),
        confusion,
    })
}
