//! Cancer type labels aligned to expression samples.

use crate::data::delimiter_for;
use crate::data::ExpressionMatrix;
use crate::error::{BiomarkerError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use std::str::FromStr;

/// Tumor types present in the pan-cancer RNA-seq cohort.
///
/// Variants are ordered alphabetically; this is the canonical class order
/// used for model outputs and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CancerType {
    /// Breast invasive carcinoma
    BRCA,
    /// Colon adenocarcinoma
    COAD,
    /// Kidney renal clear cell carcinoma
    KIRC,
    /// Lung adenocarcinoma
    LUAD,
    /// Prostate adenocarcinoma
    PRAD,
}

impl CancerType {
    /// All cancer types in canonical order.
    pub const ALL: [CancerType; 5] = [
        CancerType::BRCA,
        CancerType::COAD,
        CancerType::KIRC,
        CancerType::LUAD,
        CancerType::PRAD,
    ];

    /// Short TCGA code.
    pub fn code(&self) -> &'static str {
        match self {
            CancerType::BRCA => "BRCA",
            CancerType::COAD => "COAD",
            CancerType::KIRC => "KIRC",
            CancerType::LUAD => "LUAD",
            CancerType::PRAD => "PRAD",
        }
    }
}

impl std::fmt::Display for CancerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.code())
    }
}

impl FromStr for CancerType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BRCA" => Ok(CancerType::BRCA),
            "COAD" => Ok(CancerType::COAD),
            "KIRC" => Ok(CancerType::KIRC),
            "LUAD" => Ok(CancerType::LUAD),
            "PRAD" => Ok(CancerType::PRAD),
            other => Err(other.to_string()),
        }
    }
}

/// One class label per sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelVector {
    /// Sample identifiers, in row order
    sample_ids: Vec<String>,
    /// Class label for each sample
    labels: Vec<CancerType>,
}

impl LabelVector {
    /// Create a label vector from parallel sample IDs and labels.
    pub fn new(sample_ids: Vec<String>, labels: Vec<CancerType>) -> Result<Self> {
        if sample_ids.len() != labels.len() {
            return Err(BiomarkerError::DimensionMismatch {
                expected: sample_ids.len(),
                actual: labels.len(),
            });
        }
        Ok(Self { sample_ids, labels })
    }

    /// Load labels from a delimited file.
    ///
    /// The first column holds sample IDs; the label is read from the column
    /// named `column` (conventionally `Class`).
    pub fn from_csv<P: AsRef<Path>>(path: P, column: &str) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        Self::from_reader(file, delimiter_for(path), column)
    }

    /// Parse labels from any reader. See [`LabelVector::from_csv`].
    pub fn from_reader<R: Read>(reader: R, delimiter: u8, column: &str) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .from_reader(reader);

        let header = csv_reader.headers()?.clone();
        let label_col = header
            .iter()
            .position(|h| h.trim() == column)
            .ok_or_else(|| BiomarkerError::MissingColumn(column.to_string()))?;
        if label_col == 0 {
            return Err(BiomarkerError::InvalidParameter(format!(
                "Label column '{}' cannot be the sample ID column",
                column
            )));
        }

        let mut sample_ids = Vec::new();
        let mut labels = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            let sample = record.get(0).unwrap_or_default().trim().to_string();
            let raw = record.get(label_col).unwrap_or_default();
            let label = raw.parse::<CancerType>().map_err(|label| {
                BiomarkerError::UnknownLabel {
                    label,
                    sample: sample.clone(),
                }
            })?;
            sample_ids.push(sample);
            labels.push(label);
        }

        if labels.is_empty() {
            return Err(BiomarkerError::EmptyData("No labels in label table".to_string()));
        }
        Self::new(sample_ids, labels)
    }

    /// Write labels as a two-column CSV (`sample_id,Class`).
    pub fn to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "sample_id,Class")?;
        for (sample, label) in self.sample_ids.iter().zip(&self.labels) {
            writeln!(writer, "{},{}", sample, label)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Number of labelled samples.
    #[inline]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether there are no labels.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Labels in sample order.
    #[inline]
    pub fn labels(&self) -> &[CancerType] {
        &self.labels
    }

    /// Sample identifiers in order.
    #[inline]
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Distinct classes present, in canonical order.
    pub fn classes(&self) -> Vec<CancerType> {
        self.class_counts().into_keys().collect()
    }

    /// Number of samples per class.
    pub fn class_counts(&self) -> BTreeMap<CancerType, usize> {
        let mut counts = BTreeMap::new();
        for &label in &self.labels {
            *counts.entry(label).or_insert(0) += 1;
        }
        counts
    }

    /// Encode labels as indices into `classes`.
    pub fn encode(&self, classes: &[CancerType]) -> Result<Vec<usize>> {
        self.labels
            .iter()
            .zip(&self.sample_ids)
            .map(|(label, sample)| {
                classes.iter().position(|c| c == label).ok_or_else(|| {
                    BiomarkerError::UnknownLabel {
                        label: label.to_string(),
                        sample: sample.clone(),
                    }
                })
            })
            .collect()
    }

    /// Labels for a subset of samples (by index), in the given order.
    pub fn subset(&self, indices: &[usize]) -> Result<Self> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.len()) {
            return Err(BiomarkerError::InvalidParameter(format!(
                "Sample index {} out of bounds",
                bad
            )));
        }
        Self::new(
            indices.iter().map(|&i| self.sample_ids[i].clone()).collect(),
            indices.iter().map(|&i| self.labels[i]).collect(),
        )
    }
}

/// Align labels to the sample order of an expression matrix.
///
/// The row counts must agree. Labels already in matrix order are returned
/// unchanged; the same sample set in a different order is reordered; any
/// other difference in sample IDs is an error.
pub fn align_labels(matrix: &ExpressionMatrix, labels: &LabelVector) -> Result<LabelVector> {
    if matrix.n_samples() != labels.len() {
        return Err(BiomarkerError::DimensionMismatch {
            expected: matrix.n_samples(),
            actual: labels.len(),
        });
    }
    if matrix.sample_ids() == labels.sample_ids() {
        return Ok(labels.clone());
    }

    let mut seen = HashSet::new();
    if let Some(dup) = labels.sample_ids().iter().find(|s| !seen.insert(s.as_str())) {
        return Err(BiomarkerError::DuplicateIdentifier(format!(
            "sample '{}' appears twice in label table",
            dup
        )));
    }

    let lookup: HashMap<&str, usize> = labels
        .sample_ids()
        .iter()
        .enumerate()
        .map(|(i, s)| (s.as_str(), i))
        .collect();
    let order = matrix
        .sample_ids()
        .iter()
        .map(|s| {
            lookup.get(s.as_str()).copied().ok_or_else(|| {
                BiomarkerError::SampleMismatch(format!(
                    "sample '{}' has no label",
                    s
                ))
            })
        })
        .collect::<Result<Vec<_>>>()?;
    labels.subset(&order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;

    fn matrix(ids: &[&str]) -> ExpressionMatrix {
        ExpressionMatrix::new(
            DMatrix::zeros(ids.len(), 1),
            ids.iter().map(|s| s.to_string()).collect(),
            vec!["gene_0".to_string()],
        )
        .unwrap()
    }

    #[test]
    fn test_from_reader() {
        let text = ",Class\nsample_0,PRAD\nsample_1,LUAD\nsample_2,PRAD\n";
        let labels = LabelVector::from_reader(text.as_bytes(), b',', "Class").unwrap();
        assert_eq!(labels.len(), 3);
        assert_eq!(labels.labels()[1], CancerType::LUAD);
        assert_eq!(labels.classes(), vec![CancerType::LUAD, CancerType::PRAD]);
        assert_eq!(labels.class_counts()[&CancerType::PRAD], 2);
    }

    #[test]
    fn test_unknown_label() {
        let text = "id,Class\ns0,GBM\n";
        let err = LabelVector::from_reader(text.as_bytes(), b',', "Class").unwrap_err();
        assert!(matches!(err, BiomarkerError::UnknownLabel { .. }));
    }

    #[test]
    fn test_missing_column() {
        let text = "id,Type\ns0,BRCA\n";
        let err = LabelVector::from_reader(text.as_bytes(), b',', "Class").unwrap_err();
        assert!(matches!(err, BiomarkerError::MissingColumn(_)));
    }

    #[test]
    fn test_align_reorders() {
        let labels = LabelVector::new(
            vec!["b".into(), "a".into()],
            vec![CancerType::KIRC, CancerType::BRCA],
        )
        .unwrap();
        let aligned = align_labels(&matrix(&["a", "b"]), &labels).unwrap();
        assert_eq!(aligned.labels(), &[CancerType::BRCA, CancerType::KIRC]);
    }

    #[test]
    fn test_align_rejects_mismatch() {
        let labels = LabelVector::new(
            vec!["a".into(), "c".into()],
            vec![CancerType::KIRC, CancerType::BRCA],
        )
        .unwrap();
        let err = align_labels(&matrix(&["a", "b"]), &labels).unwrap_err();
        assert!(matches!(err, BiomarkerError::SampleMismatch(_)));

        let err = align_labels(&matrix(&["a"]), &labels).unwrap_err();
        assert!(matches!(err, BiomarkerError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_encode() {
        let labels = LabelVector::new(
            vec!["a".into(), "b".into()],
            vec![CancerType::PRAD, CancerType::BRCA],
        )
        .unwrap();
        let classes = labels.classes();
        assert_eq!(labels.encode(&classes).unwrap(), vec![1, 0]);
        assert!(labels.encode(&[CancerType::BRCA]).is_err());
    }
}
