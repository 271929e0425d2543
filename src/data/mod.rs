//! Data structures for expression analysis.

pub mod artifact;
mod expression_matrix;
mod labels;

pub use artifact::{load_json, save_json, StagedFiles};
pub(crate) use expression_matrix::delimiter_for;
pub use expression_matrix::ExpressionMatrix;
pub use labels::{align_labels, CancerType, LabelVector};
