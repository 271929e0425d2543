//! Dense expression matrix for RNA-seq samples.

use crate::error::{BiomarkerError, Result};
use nalgebra::DMatrix;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

/// Field values treated as missing when reading delimited text.
const MISSING_TOKENS: [&str; 5] = ["", "NA", "NaN", "nan", "null"];

/// A dense expression matrix.
///
/// Rows represent samples, columns represent features (genes). Values are
/// stored in a column-major `DMatrix`, so per-feature operations read
/// contiguous memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MatrixRecord", into = "MatrixRecord")]
pub struct ExpressionMatrix {
    /// Values (samples × features)
    data: DMatrix<f64>,
    /// Sample identifiers (row names)
    sample_ids: Vec<String>,
    /// Feature identifiers (column names)
    feature_ids: Vec<String>,
}

/// Row-major serialized form of an [`ExpressionMatrix`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct MatrixRecord {
    sample_ids: Vec<String>,
    feature_ids: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl From<ExpressionMatrix> for MatrixRecord {
    fn from(matrix: ExpressionMatrix) -> Self {
        let rows = (0..matrix.n_samples())
            .map(|i| matrix.data.row(i).iter().copied().collect())
            .collect();
        MatrixRecord {
            sample_ids: matrix.sample_ids,
            feature_ids: matrix.feature_ids,
            rows,
        }
    }
}

impl TryFrom<MatrixRecord> for ExpressionMatrix {
    type Error = BiomarkerError;

    fn try_from(record: MatrixRecord) -> Result<Self> {
        let n_features = record.feature_ids.len();
        for row in &record.rows {
            if row.len() != n_features {
                return Err(BiomarkerError::DimensionMismatch {
                    expected: n_features,
                    actual: row.len(),
                });
            }
        }
        let data = DMatrix::from_fn(record.rows.len(), n_features, |i, j| record.rows[i][j]);
        ExpressionMatrix::new(data, record.sample_ids, record.feature_ids)
    }
}

impl ExpressionMatrix {
    /// Create a new ExpressionMatrix from dense values and identifiers.
    pub fn new(
        data: DMatrix<f64>,
        sample_ids: Vec<String>,
        feature_ids: Vec<String>,
    ) -> Result<Self> {
        if data.nrows() != sample_ids.len() {
            return Err(BiomarkerError::DimensionMismatch {
                expected: data.nrows(),
                actual: sample_ids.len(),
            });
        }
        if data.ncols() != feature_ids.len() {
            return Err(BiomarkerError::DimensionMismatch {
                expected: data.ncols(),
                actual: feature_ids.len(),
            });
        }
        Ok(Self {
            data,
            sample_ids,
            feature_ids,
        })
    }

    /// Load an expression matrix from a delimited text file.
    ///
    /// Files ending in `.tsv` or `.txt` are read as tab-separated, anything
    /// else as comma-separated. See [`ExpressionMatrix::from_reader`] for the
    /// expected layout.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        Self::from_reader(file, delimiter_for(path))
    }

    /// Parse an expression matrix from any reader.
    ///
    /// Expected format:
    /// - First row: header; the first column names the sample ID column,
    ///   remaining columns are feature IDs (`gene_<N>`)
    /// - Subsequent rows: sample ID followed by one value per feature
    ///
    /// Empty, `NA` and `NaN` fields are kept as missing (NaN) so that the
    /// integrity check can count them. Any other unparseable field is an error.
    pub fn from_reader<R: Read>(reader: R, delimiter: u8) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(false)
            .from_reader(reader);

        let header = csv_reader.headers()?.clone();
        if header.len() < 2 {
            return Err(BiomarkerError::EmptyData(
                "Expression table must have at least one feature column".to_string(),
            ));
        }
        let feature_ids: Vec<String> = header.iter().skip(1).map(|s| s.trim().to_string()).collect();
        let n_features = feature_ids.len();

        let mut sample_ids = Vec::new();
        let mut values: Vec<f64> = Vec::new();
        for (row_idx, record) in csv_reader.records().enumerate() {
            let record = record?;
            if record.len() != n_features + 1 {
                return Err(BiomarkerError::DimensionMismatch {
                    expected: n_features + 1,
                    actual: record.len(),
                });
            }
            sample_ids.push(record[0].trim().to_string());
            for (col_idx, field) in record.iter().skip(1).enumerate() {
                values.push(parse_value(field, row_idx, col_idx)?);
            }
        }

        if sample_ids.is_empty() {
            return Err(BiomarkerError::EmptyData(
                "No samples in expression table".to_string(),
            ));
        }

        let data = DMatrix::from_row_slice(sample_ids.len(), n_features, &values);
        Self::new(data, sample_ids, feature_ids)
    }

    /// Write the matrix as comma-separated text, one row per sample.
    pub fn to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        write!(writer, "sample_id")?;
        for feature_id in &self.feature_ids {
            write!(writer, ",{}", feature_id)?;
        }
        writeln!(writer)?;

        for (i, sample_id) in self.sample_ids.iter().enumerate() {
            write!(writer, "{}", sample_id)?;
            for j in 0..self.n_features() {
                write!(writer, ",{}", self.data[(i, j)])?;
            }
            writeln!(writer)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Number of samples (rows).
    #[inline]
    pub fn n_samples(&self) -> usize {
        self.data.nrows()
    }

    /// Number of features (columns).
    #[inline]
    pub fn n_features(&self) -> usize {
        self.data.ncols()
    }

    /// Get the value for (sample, feature).
    #[inline]
    pub fn get(&self, sample: usize, feature: usize) -> f64 {
        self.data[(sample, feature)]
    }

    /// Sample identifiers.
    #[inline]
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Feature identifiers.
    #[inline]
    pub fn feature_ids(&self) -> &[String] {
        &self.feature_ids
    }

    /// Get the underlying dense matrix.
    #[inline]
    pub fn data(&self) -> &DMatrix<f64> {
        &self.data
    }

    /// Values of one feature across all samples.
    pub fn column(&self, feature: usize) -> &[f64] {
        let n = self.n_samples();
        &self.data.as_slice()[feature * n..(feature + 1) * n]
    }

    /// Look up the column index of a feature.
    pub fn feature_index(&self, feature_id: &str) -> Option<usize> {
        self.feature_ids.iter().position(|f| f == feature_id)
    }

    /// Per-feature population mean and standard deviation (ddof = 0).
    pub fn column_moments(&self) -> Vec<(f64, f64)> {
        (0..self.n_features())
            .into_par_iter()
            .map(|j| {
                let col = self.column(j);
                let n = col.len() as f64;
                let mean = col.iter().sum::<f64>() / n;
                let var = col.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
                (mean, var.sqrt())
            })
            .collect()
    }

    /// Subset the matrix to the given features (by index), in the given order.
    pub fn subset_features(&self, indices: &[usize]) -> Result<Self> {
        if let Some(&bad) = indices.iter().find(|&&j| j >= self.n_features()) {
            return Err(BiomarkerError::InvalidParameter(format!(
                "Feature index {} out of bounds",
                bad
            )));
        }
        let data = self.data.select_columns(indices);
        let feature_ids = indices.iter().map(|&j| self.feature_ids[j].clone()).collect();
        Self::new(data, self.sample_ids.clone(), feature_ids)
    }

    /// Subset the matrix to the given samples (by index), in the given order.
    pub fn subset_samples(&self, indices: &[usize]) -> Result<Self> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.n_samples()) {
            return Err(BiomarkerError::InvalidParameter(format!(
                "Sample index {} out of bounds",
                bad
            )));
        }
        let data = self.data.select_rows(indices);
        let sample_ids = indices.iter().map(|&i| self.sample_ids[i].clone()).collect();
        Self::new(data, sample_ids, self.feature_ids.clone())
    }

    /// Reorder and subset columns to match the given feature IDs.
    ///
    /// Every requested feature must be present.
    pub fn select_feature_ids(&self, feature_ids: &[String]) -> Result<Self> {
        let lookup: HashMap<&str, usize> = self
            .feature_ids
            .iter()
            .enumerate()
            .map(|(j, id)| (id.as_str(), j))
            .collect();
        let indices = feature_ids
            .iter()
            .map(|id| {
                lookup.get(id.as_str()).copied().ok_or_else(|| {
                    BiomarkerError::MissingColumn(id.clone())
                })
            })
            .collect::<Result<Vec<_>>>()?;
        self.subset_features(&indices)
    }

    /// Replace the values, keeping identifiers.
    pub fn with_data(&self, data: DMatrix<f64>) -> Result<Self> {
        Self::new(data, self.sample_ids.clone(), self.feature_ids.clone())
    }
}

/// Pick the field delimiter from a file extension.
pub(crate) fn delimiter_for(path: &Path) -> u8 {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") || ext.eq_ignore_ascii_case("txt") => b'\t',
        _ => b',',
    }
}

fn parse_value(field: &str, row: usize, col: usize) -> Result<f64> {
    let trimmed = field.trim();
    if MISSING_TOKENS.contains(&trimmed) {
        return Ok(f64::NAN);
    }
    trimmed.parse::<f64>().map_err(|_| BiomarkerError::InvalidValue {
        value: field.to_string(),
        row,
        col,
    })
}
