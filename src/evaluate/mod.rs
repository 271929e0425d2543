//! Evaluation of classifier predictions.

pub mod metrics;

pub use metrics::{classification_report, ClassMetrics, ClassificationReport, ConfusionMatrix};
