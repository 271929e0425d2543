//! Synthetic data generation for benchmarking and testing.
//!
//! Generates labelled expression matrices with known class-specific genes,
//! shaped like log-transformed RNA-seq values (non-negative, gene-specific
//! baselines), so the pipeline can be validated against ground truth.

use crate::data::{CancerType, ExpressionMatrix, LabelVector};
use crate::error::{BiomarkerError, Result};
use nalgebra::DMatrix;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Configuration for synthetic data generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    /// Name/identifier for this dataset.
    pub name: String,
    /// Samples generated for each class.
    pub class_sizes: BTreeMap<CancerType, usize>,
    /// Number of expressed genes.
    pub n_features: usize,
    /// Genes shifted upward in each class (disjoint blocks per class).
    pub n_informative: usize,
    /// Shift applied to a class's informative genes.
    pub effect_size: f64,
    /// Typical expression level; gene baselines are drawn from [0.5, 1.5) × this.
    pub baseline: f64,
    /// Standard deviation of per-sample noise.
    pub noise: f64,
    /// Additional genes that are zero in every sample.
    pub n_silent: usize,
    /// Random seed for reproducibility.
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            name: "synthetic".to_string(),
            class_sizes: CancerType::ALL.iter().map(|&c| (c, 20)).collect(),
            n_features: 200,
            n_informative: 10,
            effect_size: 2.0,
            baseline: 6.0,
            noise: 1.0,
            n_silent: 0,
            seed: 42,
        }
    }
}

impl SyntheticConfig {
    /// Create a new config with the given name.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Set the same number of samples for each of the given classes.
    pub fn with_classes(mut self, classes: &[CancerType], samples_per_class: usize) -> Self {
        self.class_sizes = classes.iter().map(|&c| (c, samples_per_class)).collect();
        self
    }

    /// Set explicit per-class sample counts.
    pub fn with_class_sizes(mut self, sizes: BTreeMap<CancerType, usize>) -> Self {
        self.class_sizes = sizes;
        self
    }

    pub fn with_features(mut self, n_features: usize, n_informative: usize) -> Self {
        self.n_features = n_features;
        self.n_informative = n_informative;
        self
    }

    pub fn with_effect(mut self, effect_size: f64, noise: f64) -> Self {
        self.effect_size = effect_size;
        self.noise = noise;
        self
    }

    pub fn with_silent(mut self, n_silent: usize) -> Self {
        self.n_silent = n_silent;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Total number of samples.
    pub fn n_samples(&self) -> usize {
        self.class_sizes.values().sum()
    }

    // Presets

    /// Class proportions of the TCGA pan-cancer cohort (801 samples).
    pub fn pan_cancer() -> Self {
        let sizes = [
            (CancerType::BRCA, 300),
            (CancerType::COAD, 78),
            (CancerType::KIRC, 146),
            (CancerType::LUAD, 141),
            (CancerType::PRAD, 136),
        ];
        Self::new("pan_cancer")
            .with_class_sizes(sizes.into_iter().collect())
            .with_features(2000, 40)
            .with_effect(1.5, 1.0)
            .with_silent(50)
    }

    /// Two well-separated classes, handy for quick checks.
    pub fn two_class() -> Self {
        Self::new("two_class")
            .with_classes(&[CancerType::BRCA, CancerType::LUAD], 30)
            .with_features(50, 5)
            .with_effect(4.0, 0.5)
    }

    /// Weak signal with few samples per class.
    pub fn low_signal() -> Self {
        Self::new("low_signal")
            .with_classes(&CancerType::ALL, 8)
            .with_features(500, 5)
            .with_effect(0.5, 1.0)
    }

    fn validate(&self) -> Result<()> {
        if self.class_sizes.len() < 2 {
            return Err(BiomarkerError::InvalidParameter(
                "At least two classes are required".to_string(),
            ));
        }
        if self.class_sizes.values().any(|&n| n == 0) {
            return Err(BiomarkerError::InvalidParameter(
                "Every class needs at least one sample".to_string(),
            ));
        }
        if self.n_features == 0 {
            return Err(BiomarkerError::InvalidParameter(
                "n_features must be at least 1".to_string(),
            ));
        }
        if !(self.noise.is_finite() && self.noise >= 0.0) || !self.baseline.is_finite() {
            return Err(BiomarkerError::InvalidParameter(format!(
                "Invalid noise {} or baseline {}",
                self.noise, self.baseline
            )));
        }
        Ok(())
    }
}

/// A generated dataset with its ground truth.
#[derive(Debug, Clone)]
pub struct SyntheticData {
    /// Expression values (samples × genes).
    pub matrix: ExpressionMatrix,
    /// Class of each sample.
    pub labels: LabelVector,
    /// Genes shifted in each class.
    pub informative_features: BTreeMap<CancerType, Vec<String>>,
    pub config: SyntheticConfig,
}

impl SyntheticData {
    /// Ground truth as TSV: one row per gene with its class, or `none`.
    pub fn ground_truth_tsv(&self) -> String {
        let mut owner: BTreeMap<&str, CancerType> = BTreeMap::new();
        for (class, genes) in &self.informative_features {
            for gene in genes {
                owner.insert(gene.as_str(), *class);
            }
        }
        let mut lines = vec!["feature_id\tinformative_for".to_string()];
        for gene in self.matrix.feature_ids() {
            let class = owner
                .get(gene.as_str())
                .map_or_else(|| "none".to_string(), |c| c.to_string());
            lines.push(format!("{}\t{}", gene, class));
        }
        lines.join("\n")
    }

    /// Write `data.csv`, `labels.csv`, `ground_truth.tsv` and `config.yaml`.
    ///
    /// # Returns
    /// Paths of the expression and label files.
    pub fn write_to_dir<P: AsRef<Path>>(&self, dir: P) -> Result<(PathBuf, PathBuf)> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let data_path = dir.join("data.csv");
        let labels_path = dir.join("labels.csv");
        self.matrix.to_csv(&data_path)?;
        self.labels.to_csv(&labels_path)?;

        let mut truth = BufWriter::new(File::create(dir.join("ground_truth.tsv"))?);
        writeln!(truth, "{}", self.ground_truth_tsv())?;
        truth.flush()?;

        std::fs::write(dir.join("config.yaml"), serde_yaml::to_string(&self.config)?)?;
        Ok((data_path, labels_path))
    }
}

/// Generate a synthetic dataset.
///
/// Each gene gets a baseline level; class `c` (in canonical order) shifts
/// its own block of `n_informative` genes up by `effect_size`. Gaussian noise
/// is added and values are floored at zero. Sample order is shuffled.
/// Identical configs always produce identical data.
pub fn generate_synthetic(config: &SyntheticConfig) -> Result<SyntheticData> {
    config.validate()?;
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let noise = Normal::new(0.0, config.noise)
        .map_err(|e| BiomarkerError::InvalidParameter(e.to_string()))?;

    let classes: Vec<CancerType> = config.class_sizes.keys().copied().collect();
    let mut sample_classes: Vec<usize> = config
        .class_sizes
        .values()
        .enumerate()
        .flat_map(|(c, &n)| std::iter::repeat(c).take(n))
        .collect();
    sample_classes.shuffle(&mut rng);

    let n_samples = sample_classes.len();
    let n_total = config.n_features + config.n_silent;
    let baselines: Vec<f64> = (0..config.n_features)
        .map(|_| config.baseline * rng.random_range(0.5..1.5))
        .collect();
    let block = |j: usize| {
        if config.n_informative == 0 {
            None
        } else {
            Some(j / config.n_informative).filter(|&c| c < classes.len())
        }
    };

    let mut data = DMatrix::zeros(n_samples, n_total);
    for (i, &class) in sample_classes.iter().enumerate() {
        for (j, &base) in baselines.iter().enumerate() {
            let shift = if block(j) == Some(class) {
                config.effect_size
            } else {
                0.0
            };
            let value: f64 = base + shift + rng.sample(noise);
            data[(i, j)] = value.max(0.0);
        }
    }

    let feature_ids: Vec<String> = (0..n_total).map(|j| format!("gene_{}", j)).collect();
    let sample_ids: Vec<String> = (0..n_samples).map(|i| format!("sample_{}", i)).collect();

    let mut informative_features: BTreeMap<CancerType, Vec<String>> = BTreeMap::new();
    for j in 0..config.n_features {
        if let Some(c) = block(j) {
            informative_features
                .entry(classes[c])
                .or_default()
                .push(feature_ids[j].clone());
        }
    }

    let labels = LabelVector::new(
        sample_ids.clone(),
        sample_classes.iter().map(|&c| classes[c]).collect(),
    )?;
    let matrix = ExpressionMatrix::new(data, sample_ids, feature_ids)?;

    Ok(SyntheticData {
        matrix,
        labels,
        informative_features,
        config: config.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_shape() {
        let config = SyntheticConfig::default().with_silent(3);
        let data = generate_synthetic(&config).unwrap();
        assert_eq!(data.matrix.n_samples(), 100);
        assert_eq!(data.matrix.n_features(), 203);
        assert_eq!(data.labels.len(), 100);
        assert_eq!(data.labels.class_counts()[&CancerType::KIRC], 20);
        assert!(data.matrix.data().iter().all(|&v| v >= 0.0 && v.is_finite()));
        assert!(data.matrix.column(202).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_informative_blocks() {
        let data = generate_synthetic(&SyntheticConfig::default()).unwrap();
        assert_eq!(data.informative_features.len(), 5);
        assert_eq!(data.informative_features[&CancerType::BRCA][0], "gene_0");
        assert_eq!(data.informative_features[&CancerType::COAD][0], "gene_10");
        assert!(data.ground_truth_tsv().contains("gene_10\tCOAD"));
        assert!(data.ground_truth_tsv().contains("gene_199\tnone"));
    }

    #[test]
    fn test_informative_gene_is_shifted() {
        let config = SyntheticConfig::two_class();
        let data = generate_synthetic(&config).unwrap();
        let gene = data.matrix.column(0);
        let (mut in_class, mut out_class) = (Vec::new(), Vec::new());
        for (v, label) in gene.iter().zip(data.labels.labels()) {
            if *label == CancerType::BRCA {
                in_class.push(*v);
            } else {
                out_class.push(*v);
            }
        }
        let mean = |v: &[f64]| v.iter().sum::<f64>() / v.len() as f64;
        assert!(mean(&in_class) - mean(&out_class) > 2.0);
    }

    #[test]
    fn test_deterministic() {
        let a = generate_synthetic(&SyntheticConfig::low_signal()).unwrap();
        let b = generate_synthetic(&SyntheticConfig::low_signal()).unwrap();
        assert_eq!(a.matrix, b.matrix);
        assert_eq!(a.labels, b.labels);
        let c = generate_synthetic(&SyntheticConfig::low_signal().with_seed(7)).unwrap();
        assert_ne!(a.matrix, c.matrix);
    }

    #[test]
    fn test_invalid_config() {
        let config = SyntheticConfig::default().with_classes(&[CancerType::PRAD], 10);
        assert!(generate_synthetic(&config).is_err());
    }

    #[test]
    fn test_write_to_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let data = generate_synthetic(&SyntheticConfig::two_class()).unwrap();
        let (data_path, labels_path) = data.write_to_dir(dir.path()).unwrap();
        let matrix = ExpressionMatrix::from_csv(&data_path).unwrap();
        let labels = LabelVector::from_csv(&labels_path, "Class").unwrap();
        assert_eq!(matrix.n_samples(), 60);
        assert_eq!(labels, data.labels);
        assert!(dir.path().join("ground_truth.tsv").exists());
    }
}
