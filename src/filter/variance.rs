//! Variance-based feature filtering.

use crate::error::{BiomarkerError, Result};

/// Select features whose variance exceeds a threshold.
///
/// Keeps features with variance strictly greater than `threshold`, so the
/// default of 0.0 removes only constant features.
///
/// # Arguments
/// * `variances` - Per-feature variance on the original (unscaled) values
/// * `threshold` - Minimum variance to keep (non-negative)
///
/// # Returns
/// Indices of retained features, in original order.
pub fn filter_variance(variances: &[f64], threshold: f64) -> Result<Vec<usize>> {
    if !(threshold >= 0.0) {
        return Err(BiomarkerError::InvalidParameter(format!(
            "Variance threshold must be non-negative, got {}",
            threshold
        )));
    }

    let keep: Vec<usize> = variances
        .iter()
        .enumerate()
        .filter(|(_, &v)| v > threshold)
        .map(|(j, _)| j)
        .collect();

    if keep.is_empty() {
        return Err(BiomarkerError::EmptyData(format!(
            "No features have variance above {}",
            threshold
        )));
    }
    Ok(keep)
}
