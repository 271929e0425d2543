//! Synthetic labelled datasets with known ground truth.
//!
//! Used to exercise the pipeline end to end without the real cohort and to
//! check that the selected biomarkers recover the genes that were planted.

mod generate;

pub use generate::{generate_synthetic, SyntheticConfig, SyntheticData};
