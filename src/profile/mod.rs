//! Data profiling primitives for raw expression data.

mod integrity;
mod summary;

pub use integrity::{profile_integrity, IntegrityReport};
pub use summary::{profile_summary, DataSummary};
