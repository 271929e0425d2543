//! Feature filtering and selection primitives.

pub mod anova;
pub mod variance;

pub use anova::{anova_f, select_k_best, AnovaScores, FeatureSubset};
pub use variance::filter_variance;
