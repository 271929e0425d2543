//! Coefficient-based feature ranking and biomarker panel selection.

use crate::data::CancerType;
use crate::error::{BiomarkerError, Result};
use crate::interpret::hgnc::{Resolution, SymbolResolver};
use crate::model::LinearModel;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Overall ranking of one feature by its coefficients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoefficientRanking {
    /// 1-based rank by largest absolute coefficient.
    pub rank: usize,
    /// Feature identifier.
    pub gene_id: String,
    /// Signed coefficient for each class, in model class order.
    pub coefficients: Vec<f64>,
    /// Largest absolute coefficient across classes.
    pub max_abs_coef: f64,
    /// Class with the largest absolute coefficient.
    pub dominant_class: CancerType,
    /// Signed coefficient for the dominant class.
    pub dominant_coef: f64,
}

/// Rank every feature of a linear model by its largest absolute coefficient.
///
/// The dominant class of a feature is the class with the largest absolute
/// coefficient; ties go to the class listed first in the model. Features
/// with equal magnitude keep their model column order.
pub fn rank_coefficients(model: &LinearModel) -> Result<Vec<CoefficientRanking>> {
    if model.classes.is_empty() || model.coefficients.len() != model.classes.len() {
        return Err(BiomarkerError::InvalidParameter(
            "Model has no per-class coefficients".to_string(),
        ));
    }
    if let Some(row) = model.coefficients.iter().find(|row| row.len() != model.n_features()) {
        return Err(BiomarkerError::DimensionMismatch {
            expected: model.n_features(),
            actual: row.len(),
        });
    }

    let mut rankings: Vec<CoefficientRanking> = model
        .feature_ids
        .iter()
        .enumerate()
        .map(|(j, gene_id)| {
            let coefficients: Vec<f64> = model.coefficients.iter().map(|row| row[j]).collect();
            let mut dominant = 0;
            for (c, v) in coefficients.iter().enumerate() {
                if v.abs() > coefficients[dominant].abs() {
                    dominant = c;
                }
            }
            CoefficientRanking {
                rank: 0,
                gene_id: gene_id.clone(),
                max_abs_coef: coefficients[dominant].abs(),
                dominant_class: model.classes[dominant],
                dominant_coef: coefficients[dominant],
                coefficients,
            }
        })
        .collect();

    rankings.sort_by(|a, b| b.max_abs_coef.total_cmp(&a.max_abs_coef));
    for (i, r) in rankings.iter_mut().enumerate() {
        r.rank = i + 1;
    }
    Ok(rankings)
}

/// Top features for each class by absolute coefficient within that class.
///
/// # Returns
/// For each class, up to `n` (gene id, signed coefficient) pairs.
pub fn top_features_per_class(
    model: &LinearModel,
    n: usize,
) -> BTreeMap<CancerType, Vec<(String, f64)>> {
    model
        .classes
        .iter()
        .zip(&model.coefficients)
        .map(|(&class, row)| {
            let mut order: Vec<usize> = (0..row.len()).collect();
            order.sort_by(|&a, &b| row[b].abs().total_cmp(&row[a].abs()));
            let top = order
                .into_iter()
                .take(n)
                .map(|j| (model.feature_ids[j].clone(), row[j]))
                .collect();
            (class, top)
        })
        .collect()
}

/// One member of the biomarker panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelEntry {
    /// 1-based position in the panel.
    pub rank: usize,
    /// Feature identifier.
    pub gene_id: String,
    /// External symbol lookup outcome.
    pub symbol: Resolution,
    /// Class with the largest absolute coefficient.
    pub dominant_class: CancerType,
    /// Signed coefficient for the dominant class.
    pub coefficient: f64,
}

/// The final ranked list of candidate biomarkers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiomarkerPanel {
    /// Entries by descending absolute coefficient.
    pub entries: Vec<PanelEntry>,
    /// Number of features the panel was drawn from.
    pub total_features: usize,
}

impl BiomarkerPanel {
    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the panel is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolved symbols, in panel order.
    pub fn symbols(&self) -> Vec<&str> {
        self.entries.iter().filter_map(|e| e.symbol.symbol()).collect()
    }

    /// Fraction of entries with a resolved symbol.
    pub fn resolution_rate(&self) -> f64 {
        if self.entries.is_empty() {
            return 0.0;
        }
        self.symbols().len() as f64 / self.entries.len() as f64
    }
}

impl std::fmt::Display for BiomarkerPanel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Biomarker Panel ({} of {} features, {:.0}% resolved)",
            self.len(),
            self.total_features,
            self.resolution_rate() * 100.0
        )?;
        for e in self.entries.iter().take(10) {
            writeln!(
                f,
                "  {:>3}. {:<12} {:<10} {:<5} {:+.4}",
                e.rank, e.gene_id, e.symbol, e.dominant_class, e.coefficient
            )?;
        }
        if self.len() > 10 {
            writeln!(f, "  ... {} more", self.len() - 10)?;
        }
        Ok(())
    }
}

/// Take the top `size` ranked features and resolve their symbols.
///
/// # Arguments
/// * `rankings` - Output of [`rank_coefficients`], best first
/// * `size` - Panel size; fewer entries are returned if fewer features exist
/// * `resolver` - Identifier lookup; misses are recorded as unresolved
pub fn select_panel<R: SymbolResolver + ?Sized>(
    rankings: &[CoefficientRanking],
    size: usize,
    resolver: &R,
) -> Result<BiomarkerPanel> {
    if size == 0 {
        return Err(BiomarkerError::InvalidParameter(
            "Panel size must be at least 1".to_string(),
        ));
    }
    let mut seen = HashSet::new();
    if let Some(dup) = rankings.iter().find(|r| !seen.insert(r.gene_id.as_str())) {
        return Err(BiomarkerError::DuplicateIdentifier(format!(
            "feature '{}' ranked twice",
            dup.gene_id
        )));
    }

    let entries = rankings
        .iter()
        .take(size)
        .enumerate()
        .map(|(i, r)| PanelEntry {
            rank: i + 1,
            gene_id: r.gene_id.clone(),
            symbol: resolver.resolve(&r.gene_id),
            dominant_class: r.dominant_class,
            coefficient: r.dominant_coef,
        })
        .collect();
    Ok(BiomarkerPanel {
        entries,
        total_features: rankings.len(),
    })
}
