//! Report writers for interpretation results.

use crate::data::CancerType;
use crate::error::Result;
use crate::interpret::ranking::{BiomarkerPanel, CoefficientRanking};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write the panel as TSV: gene_id, symbol, dominant_class, coefficient, rank.
pub fn write_panel_tsv<P: AsRef<Path>>(panel: &BiomarkerPanel, path: P) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, "gene_id\tsymbol\tdominant_class\tcoefficient\trank")?;
    for e in &panel.entries {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}",
            e.gene_id, e.symbol, e.dominant_class, e.coefficient, e.rank
        )?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the full coefficient ranking as TSV.
///
/// Columns: gene_id, one column per class, max_abs_coef, dominant_class,
/// dominant_coef, rank.
pub fn write_rankings_tsv<P: AsRef<Path>>(
    rankings: &[CoefficientRanking],
    classes: &[CancerType],
    path: P,
) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write!(writer, "gene_id")?;
    for class in classes {
        write!(writer, "\t{}", class)?;
    }
    writeln!(writer, "\tmax_abs_coef\tdominant_class\tdominant_coef\trank")?;
    for r in rankings {
        write!(writer, "{}", r.gene_id)?;
        for v in &r.coefficients {
            write!(writer, "\t{}", v)?;
        }
        writeln!(
            writer,
            "\t{}\t{}\t{}\t{}",
            r.max_abs_coef, r.dominant_class, r.dominant_coef, r.rank
        )?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the per-class top features as TSV: class, rank, gene_id, coefficient.
pub fn write_class_top_tsv<P: AsRef<Path>>(
    top: &BTreeMap<CancerType, Vec<(String, f64)>>,
    path: P,
) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, "class\trank\tgene_id\tcoefficient")?;
    for (class, features) in top {
        for (i, (gene_id, coef)) in features.iter().enumerate() {
            writeln!(writer, "{}\t{}\t{}\t{}", class, i + 1, gene_id, coef)?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Write resolved symbols, one per line, for pathway enrichment tools.
pub fn write_symbol_list<P: AsRef<Path>>(panel: &BiomarkerPanel, path: P) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for symbol in panel.symbols() {
        writeln!(writer, "{}", symbol)?;
    }
    writer.flush()?;
    Ok(())
}

/// Header block of the dashboard data file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardMetadata {
    pub title: String,
    pub description: String,
    pub model: String,
    pub total_genes_analyzed: usize,
    pub generated_date: String,
}

/// One biomarker as shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardBiomarker {
    pub rank: usize,
    pub gene_id: String,
    /// Resolved symbol, or the gene ID when unresolved.
    pub hgnc_symbol: String,
    pub max_abs_coef: f64,
    pub dominant_class: CancerType,
    pub dominant_coef: f64,
    /// Coefficient per class; 0 for classes the model did not see.
    pub coefficients: BTreeMap<CancerType, f64>,
}

/// The dashboard's biomarker data file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardData {
    pub metadata: DashboardMetadata,
    pub biomarkers: Vec<DashboardBiomarker>,
}

fn round4(v: f64) -> f64 {
    (v * 1e4).round() / 1e4
}

/// Assemble the dashboard data from the panel and its rankings.
///
/// Values are rounded to 4 decimals.
pub fn dashboard_data(
    panel: &BiomarkerPanel,
    rankings: &[CoefficientRanking],
    classes: &[CancerType],
) -> DashboardData {
    let biomarkers = panel
        .entries
        .iter()
        .zip(rankings)
        .map(|(entry, ranking)| {
            let coefficients = CancerType::ALL
                .iter()
                .map(|ct| {
                    let value = classes
                        .iter()
                        .position(|c| c == ct)
                        .map_or(0.0, |c| round4(ranking.coefficients[c]));
                    (*ct, value)
                })
                .collect();
            DashboardBiomarker {
                rank: entry.rank,
                gene_id: entry.gene_id.clone(),
                hgnc_symbol: entry
                    .symbol
                    .symbol()
                    .unwrap_or(entry.gene_id.as_str())
                    .to_string(),
                max_abs_coef: round4(ranking.max_abs_coef),
                dominant_class: entry.dominant_class,
                dominant_coef: round4(entry.coefficient),
                coefficients,
            }
        })
        .collect();

    DashboardData {
        metadata: DashboardMetadata {
            title: format!("Top {} Cancer Biomarkers", panel.len()),
            description: "Most influential genes for multi-class cancer classification".to_string(),
            model: "Logistic Regression (class_weight='balanced')".to_string(),
            total_genes_analyzed: panel.total_features,
            generated_date: chrono::Local::now().format("%Y-%m-%dT%H:%M:%S").to_string(),
        },
        biomarkers,
    }
}

/// Write the dashboard data file as pretty-printed JSON.
pub fn write_dashboard_json<P: AsRef<Path>>(data: &DashboardData, path: P) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, data)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
