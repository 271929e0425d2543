//! Gene identifier to HGNC symbol resolution.
//!
//! Resolution is an opaque key-value lookup. A miss is an expected outcome
//! and is reported as [`Resolution::Unresolved`], never as an error.

use crate::data::delimiter_for;
use crate::error::{BiomarkerError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

/// Header names accepted in the first column of a symbol table.
const ID_HEADERS: [&str; 4] = ["gene_id", "id", "gene", "feature_id"];

/// Curated cross-reference for dataset gene keys with known HGNC symbols.
const BUILTIN_SYMBOLS: [(&str, &str); 51] = [
    ("gene_15898", "STXBP3"),
    ("gene_6594", "KRT7"),
    ("gene_7964", "MLPH"),
    ("gene_2318", "CLDN4"),
    ("gene_357", "AIM2"),
    ("gene_15895", "STXBP1"),
    ("gene_5578", "GATA3"),
    ("gene_8024", "MUC1"),
    ("gene_15896", "STXBP2"),
    ("gene_15301", "SPDEF"),
    ("gene_15591", "SFTPB"),
    ("gene_9652", "FOXA1"),
    ("gene_15899", "STXBP4"),
    ("gene_5017", "FOXM1"),
    ("gene_16283", "TFF1"),
    ("gene_15668", "SFTPC"),
    ("gene_15999", "STC2"),
    ("gene_545", "AR"),
    ("gene_11762", "PGR"),
    ("gene_9176", "FOLH1"),
    ("gene_8032", "MUC16"),
    ("gene_3439", "CA9"),
    ("gene_4773", "ESR1"),
    ("gene_8034", "MUC5AC"),
    ("gene_8014", "MSX1"),
    ("gene_10279", "NAT1"),
    ("gene_11903", "PIGR"),
    ("gene_13517", "SCGB1A1"),
    ("gene_9175", "FOLH1B"),
    ("gene_8891", "MUCL1"),
    ("gene_16372", "TFF3"),
    ("gene_13639", "SCGB3A2"),
    ("gene_6734", "KRT19"),
    ("gene_5576", "GATA2"),
    ("gene_9177", "FOLR1"),
    ("gene_1735", "CEACAM5"),
    ("gene_19296", "XBP1"),
    ("gene_17905", "UPK1B"),
    ("gene_11920", "PIP"),
    ("gene_5727", "GDF15"),
    ("gene_15897", "STXBP5"),
    ("gene_6733", "KRT18"),
    ("gene_8031", "MUC13"),
    ("gene_18753", "WNT7A"),
    ("gene_15577", "SFTPA1"),
    ("gene_3785", "CDH1"),
    ("gene_1566", "CCND1"),
    ("gene_9706", "FXYD3"),
    ("gene_6530", "KLK3"),
    ("gene_11550", "PECAM1"),
    ("gene_12013", "PROM1"),
];

/// Result of looking up one identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// The identifier maps to this symbol.
    Resolved(String),
    /// The lookup had no entry.
    Unresolved,
}

impl Resolution {
    /// The resolved symbol, if any.
    pub fn symbol(&self) -> Option<&str> {
        match self {
            Resolution::Resolved(s) => Some(s),
            Resolution::Unresolved => None,
        }
    }

    /// Whether the lookup succeeded.
    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resolution::Resolved(s) => f.pad(s),
            Resolution::Unresolved => f.pad("unresolved"),
        }
    }
}

/// Maps internal feature keys to external gene symbols.
pub trait SymbolResolver {
    /// Look up one identifier.
    fn resolve(&self, gene_id: &str) -> Resolution;
}

/// In-memory symbol table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolTable {
    symbols: HashMap<String, String>,
}

impl SymbolTable {
    /// Build a table from (gene id, symbol) pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            symbols: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// The curated table shipped with the pipeline.
    pub fn builtin() -> Self {
        Self::from_pairs(BUILTIN_SYMBOLS)
    }

    /// Load a two-column table (gene id, symbol).
    ///
    /// A header row is recognized by its first field (`gene_id`, `id`,
    /// `gene` or `feature_id`) and skipped. Rows with an empty symbol are
    /// ignored.
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter_for(path))
            .has_headers(false)
            .flexible(true)
            .from_reader(file);

        let mut symbols = HashMap::new();
        for (row, record) in reader.records().enumerate() {
            let record = record?;
            let id = record.get(0).unwrap_or_default().trim();
            if row == 0 && ID_HEADERS.iter().any(|h| id.eq_ignore_ascii_case(h)) {
                continue;
            }
            let symbol = record.get(1).ok_or_else(|| {
                BiomarkerError::InvalidParameter(format!(
                    "Symbol table row {} has no symbol column",
                    row + 1
                ))
            })?;
            let symbol = symbol.trim();
            if !id.is_empty() && !symbol.is_empty() {
                symbols.insert(id.to_string(), symbol.to_string());
            }
        }
        Ok(Self { symbols })
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl SymbolResolver for SymbolTable {
    fn resolve(&self, gene_id: &str) -> Resolution {
        match self.symbols.get(gene_id) {
            Some(symbol) => Resolution::Resolved(symbol.clone()),
            None => Resolution::Unresolved,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_table() {
        let table = SymbolTable::builtin();
        assert_eq!(table.len(), 51);
        assert_eq!(table.resolve("gene_5578"), Resolution::Resolved("GATA3".to_string()));
        assert_eq!(table.resolve("gene_0"), Resolution::Unresolved);
        assert_eq!(Resolution::Unresolved.to_string(), "unresolved");
    }

    #[test]
    fn test_from_tsv_with_header() {
        let mut file = tempfile::Builder::new().suffix(".tsv").tempfile().unwrap();
        writeln!(file, "gene_id\tsymbol").unwrap();
        writeln!(file, "gene_1\tTP53").unwrap();
        writeln!(file, "gene_2\t").unwrap();
        file.flush().unwrap();
        let table = SymbolTable::from_tsv(file.path()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.resolve("gene_1").symbol(), Some("TP53"));
        assert!(!table.resolve("gene_2").is_resolved());
    }

    #[test]
    fn test_from_csv_without_header() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "gene_7,BRCA1").unwrap();
        file.flush().unwrap();
        let table = SymbolTable::from_tsv(file.path()).unwrap();
        assert_eq!(table.resolve("gene_7").symbol(), Some("BRCA1"));
    }
}
