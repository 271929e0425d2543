//! Integrity and format checks for raw expression data.

use crate::data::ExpressionMatrix;
use crate::error::{BiomarkerError, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::warn;

/// Outcome of scanning a raw expression matrix for integrity problems.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrityReport {
    /// Number of samples scanned.
    pub n_samples: usize,
    /// Number of features scanned.
    pub n_features: usize,
    /// Total number of missing (NaN) entries.
    pub total_missing: usize,
    /// Missing entries as a percentage of all entries.
    pub missing_percent: f64,
    /// Number of features with at least one missing entry.
    pub features_with_missing: usize,
    /// Number of samples with at least one missing entry.
    pub samples_with_missing: usize,
    /// Number of negative entries.
    pub n_negative: usize,
    /// Number of infinite entries.
    pub n_infinite: usize,
    /// Features whose observed values are all identical.
    pub constant_features: Vec<String>,
    /// Feature IDs that appear more than once.
    pub duplicate_features: Vec<String>,
    /// Sample IDs that appear more than once.
    pub duplicate_samples: Vec<String>,
}

/// Per-feature scan result.
struct ColumnScan {
    missing: usize,
    negative: usize,
    infinite: usize,
    constant: bool,
}

impl IntegrityReport {
    /// True if no fatal problems were found.
    pub fn is_clean(&self) -> bool {
        self.total_missing == 0
            && self.n_infinite == 0
            && self.duplicate_features.is_empty()
            && self.duplicate_samples.is_empty()
    }

    /// Fail on any fatal problem; log non-fatal ones.
    ///
    /// Missing values, infinities and duplicate identifiers are fatal.
    /// Negative values and constant features are reported as warnings.
    pub fn ensure_clean(&self) -> Result<()> {
        if self.total_missing > 0 {
            return Err(BiomarkerError::MissingValues {
                total: self.total_missing,
                features: self.features_with_missing,
                samples: self.samples_with_missing,
            });
        }
        if self.n_infinite > 0 {
            return Err(BiomarkerError::NonFinite(self.n_infinite));
        }
        if let Some(id) = self.duplicate_features.first() {
            return Err(BiomarkerError::DuplicateIdentifier(format!("feature '{}'", id)));
        }
        if let Some(id) = self.duplicate_samples.first() {
            return Err(BiomarkerError::DuplicateIdentifier(format!("sample '{}'", id)));
        }
        if self.n_negative > 0 {
            warn!("{} negative expression values found", self.n_negative);
        }
        if !self.constant_features.is_empty() {
            warn!(
                "{} constant features found (zero variance)",
                self.constant_features.len()
            );
        }
        Ok(())
    }
}

impl std::fmt::Display for IntegrityReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Integrity Report")?;
        writeln!(f, "  Shape:                 {} samples x {} features", self.n_samples, self.n_features)?;
        writeln!(f, "  Missing values:        {} ({:.4}%)", self.total_missing, self.missing_percent)?;
        writeln!(f, "  Features with missing: {}", self.features_with_missing)?;
        writeln!(f, "  Samples with missing:  {}", self.samples_with_missing)?;
        writeln!(f, "  Negative values:       {}", self.n_negative)?;
        writeln!(f, "  Infinite values:       {}", self.n_infinite)?;
        writeln!(f, "  Constant features:     {}", self.constant_features.len())?;
        writeln!(f, "  Duplicate features:    {}", self.duplicate_features.len())?;
        writeln!(f, "  Duplicate samples:     {}", self.duplicate_samples.len())?;
        writeln!(f, "  Status:                {}", if self.is_clean() { "OK" } else { "FAILED" })?;
        Ok(())
    }
}

/// Scan a raw expression matrix for missing, infinite, negative and
/// constant values and for duplicate identifiers.
pub fn profile_integrity(matrix: &ExpressionMatrix) -> IntegrityReport {
    let n_samples = matrix.n_samples();
    let n_features = matrix.n_features();

    let scans: Vec<ColumnScan> = (0..n_features)
        .into_par_iter()
        .map(|j| {
            let col = matrix.column(j);
            let mut scan = ColumnScan {
                missing: 0,
                negative: 0,
                infinite: 0,
                constant: true,
            };
            let mut first: Option<f64> = None;
            for &v in col {
                if v.is_nan() {
                    scan.missing += 1;
                    continue;
                }
                if v.is_infinite() {
                    scan.infinite += 1;
                }
                if v < 0.0 {
                    scan.negative += 1;
                }
                match first {
                    None => first = Some(v),
                    Some(x) if x != v => scan.constant = false,
                    _ => {}
                }
            }
            scan
        })
        .collect();

    let total_missing: usize = scans.iter().map(|s| s.missing).sum();
    let samples_with_missing = if total_missing == 0 {
        0
    } else {
        (0..n_samples)
            .filter(|&i| (0..n_features).any(|j| matrix.get(i, j).is_nan()))
            .count()
    };
    let total_entries = (n_samples * n_features).max(1);

    IntegrityReport {
        n_samples,
        n_features,
        total_missing,
        missing_percent: total_missing as f64 / total_entries as f64 * 100.0,
        features_with_missing: scans.iter().filter(|s| s.missing > 0).count(),
        samples_with_missing,
        n_negative: scans.iter().map(|s| s.negative).sum(),
        n_infinite: scans.iter().map(|s| s.infinite).sum(),
        constant_features: scans
            .iter()
            .zip(matrix.feature_ids())
            .filter(|(s, _)| s.constant)
            .map(|(_, id)| id.clone())
            .collect(),
        duplicate_features: duplicates(matrix.feature_ids()),
        duplicate_samples: duplicates(matrix.sample_ids()),
    }
}

fn duplicates(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    ids.iter()
        .filter(|id| !seen.insert(id.as_str()) && reported.insert(id.as_str()))
        .cloned()
        .collect()
}
