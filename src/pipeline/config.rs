//! Pipeline configuration, serialized as YAML.

use crate::error::{BiomarkerError, Result};
use crate::model::{ForestConfig, LogisticConfig, ModelKind, SvmConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Which samples feature selection may look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SelectionScope {
    /// Score features on every sample before the train/test split.
    #[default]
    FullCorpus,
    /// Score features on the training partition only, so held-out samples
    /// never influence which features are kept.
    TrainOnly,
}

/// Input and output locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Raw expression matrix (samples × genes).
    pub data: PathBuf,
    /// Label table.
    pub labels: PathBuf,
    /// Directory for artifacts and reports.
    pub output_dir: PathBuf,
    /// Optional gene id → symbol table; the built-in table is used otherwise.
    pub symbol_table: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data: PathBuf::from("data/raw/data.csv"),
            labels: PathBuf::from("data/raw/labels.csv"),
            output_dir: PathBuf::from("results"),
            symbol_table: None,
        }
    }
}

/// Ingestion settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    /// Name of the label column in the label table.
    pub label_column: String,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            label_column: "Class".to_string(),
        }
    }
}

/// Feature selection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Number of features to keep.
    pub k: usize,
    /// Drop features with raw variance at or below this before scoring
    /// (`None` disables the filter).
    pub variance_threshold: Option<f64>,
    /// Samples used for scoring.
    pub scope: SelectionScope,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            k: 1000,
            variance_threshold: Some(0.0),
            scope: SelectionScope::FullCorpus,
        }
    }
}

/// Training and evaluation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Fraction of each class held out for testing.
    pub test_fraction: f64,
    /// Seed for the split, and for the forest when `forest.seed` is unset.
    pub seed: u64,
    /// Models to fit and compare. Logistic regression is always fitted.
    pub models: Vec<ModelKind>,
    /// Logistic regression settings.
    pub logistic: LogisticConfig,
    /// Linear SVM settings.
    pub svm: SvmConfig,
    /// Random forest settings.
    pub forest: ForestConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 42,
            models: vec![ModelKind::Logistic, ModelKind::Svm, ModelKind::RandomForest],
            logistic: LogisticConfig::default(),
            svm: SvmConfig::default(),
            forest: ForestConfig::default(),
        }
    }
}

/// Interpretation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpretationConfig {
    /// Number of features in the biomarker panel.
    pub panel_size: usize,
    /// Features listed per class in the per-class report.
    pub per_class_top: usize,
}

impl Default for InterpretationConfig {
    fn default() -> Self {
        Self {
            panel_size: 50,
            per_class_top: 10,
        }
    }
}

/// Full pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Name of the run.
    pub name: String,
    pub paths: PathsConfig,
    pub cleaning: CleaningConfig,
    pub selection: SelectionConfig,
    pub training: TrainingConfig,
    pub interpretation: InterpretationConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            name: "rnaseq-biomarker".to_string(),
            paths: PathsConfig::default(),
            cleaning: CleaningConfig::default(),
            selection: SelectionConfig::default(),
            training: TrainingConfig::default(),
            interpretation: InterpretationConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Save to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(BiomarkerError::from)
    }

    /// Load from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.selection.k == 0 {
            return Err(BiomarkerError::InvalidParameter(
                "selection.k must be at least 1".to_string(),
            ));
        }
        if !(self.training.test_fraction > 0.0 && self.training.test_fraction < 1.0) {
            return Err(BiomarkerError::InvalidParameter(format!(
                "training.test_fraction must be in (0, 1), got {}",
                self.training.test_fraction
            )));
        }
        if self.interpretation.panel_size == 0 {
            return Err(BiomarkerError::InvalidParameter(
                "interpretation.panel_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Artifact locations under the configured output directory.
    pub fn layout(&self) -> ArtifactLayout {
        ArtifactLayout::new(&self.paths.output_dir)
    }
}

/// File names of every artifact and report inside an output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    root: PathBuf,
}

impl ArtifactLayout {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn cleaned(&self) -> PathBuf {
        self.root.join("cleaned.json")
    }

    pub fn scaling(&self) -> PathBuf {
        self.root.join("scaling.json")
    }

    pub fn reduced(&self) -> PathBuf {
        self.root.join("reduced.json")
    }

    pub fn model(&self) -> PathBuf {
        self.root.join("model.json")
    }

    pub fn best_model(&self) -> PathBuf {
        self.root.join("best_model.json")
    }

    pub fn training_summary(&self) -> PathBuf {
        self.root.join("training_summary.json")
    }

    pub fn comparison(&self) -> PathBuf {
        self.root.join("model_comparison.tsv")
    }

    pub fn panel(&self) -> PathBuf {
        self.root.join("biomarker_panel.tsv")
    }

    pub fn rankings(&self) -> PathBuf {
        self.root.join("coefficient_rankings.tsv")
    }

    pub fn class_top(&self) -> PathBuf {
        self.root.join("class_top_features.tsv")
    }

    pub fn dashboard(&self) -> PathBuf {
        self.root.join("biomarkers.json")
    }

    pub fn symbols(&self) -> PathBuf {
        self.root.join("panel_symbols.txt")
    }

    pub fn predictions(&self) -> PathBuf {
        self.root.join("predictions.tsv")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.selection.k, 1000);
        assert_eq!(config.training.test_fraction, 0.2);
        assert_eq!(config.training.seed, 42);
        assert_eq!(config.interpretation.panel_size, 50);
        assert_eq!(config.selection.scope, SelectionScope::FullCorpus);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_roundtrip() {
        let mut config = PipelineConfig::default();
        config.selection.scope = SelectionScope::TrainOnly;
        config.training.models = vec![ModelKind::Logistic, ModelKind::RandomForest];
        let yaml = config.to_yaml().unwrap();
        assert!(yaml.contains("train_only"));
        let back = PipelineConfig::from_yaml(&yaml).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "selection:\n  k: 20\ntraining:\n  seed: 7\n";
        let config = PipelineConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.selection.k, 20);
        assert_eq!(config.selection.variance_threshold, Some(0.0));
        assert_eq!(config.training.seed, 7);
        assert_eq!(config.training.test_fraction, 0.2);
    }

    #[test]
    fn test_invalid_values() {
        assert!(PipelineConfig::from_yaml("training:\n  test_fraction: 1.5\n").is_err());
        assert!(PipelineConfig::from_yaml("selection:\n  k: 0\n").is_err());
    }

    #[test]
    fn test_layout() {
        let layout = ArtifactLayout::new("out");
        assert_eq!(layout.panel(), PathBuf::from("out/biomarker_panel.tsv"));
        assert_eq!(layout.root(), Path::new("out"));
    }
}
