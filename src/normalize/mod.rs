//! Normalization methods for expression matrices.

pub mod zscore;

pub use zscore::{norm_zscore, ScalingParameters};
