//! The four analysis stages as pure functions over in-memory data.
//!
//! Each stage takes the previous stage's artifact and returns its own. No
//! stage touches the filesystem; persistence lives in [`crate::pipeline::runner`].

use crate::data::{align_labels, CancerType, ExpressionMatrix, LabelVector};
use crate::error::{BiomarkerError, Result};
use crate::filter::{anova_f, filter_variance, select_k_best, FeatureSubset};
use crate::interpret::{
    dashboard_data, rank_coefficients, select_panel, top_features_per_class, BiomarkerPanel,
    CoefficientRanking, DashboardData, SymbolResolver,
};
use crate::model::{
    evaluate_model, model_forest, model_logistic, model_svm, select_best_model, split_stratified,
    Classifier, ForestConfig, LinearModel, ModelComparison, ModelKind, SavedModel, SplitIndices,
};
use crate::normalize::{norm_zscore, ScalingParameters};
use crate::pipeline::config::{InterpretationConfig, SelectionConfig, SelectionScope, TrainingConfig};
use crate::profile::{profile_integrity, profile_summary, DataSummary, IntegrityReport};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Output of the cleaning stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanedDataset {
    /// Z-scored expression matrix.
    pub matrix: ExpressionMatrix,
    /// Labels in matrix sample order.
    pub labels: LabelVector,
    /// Parameters that map raw values onto `matrix`.
    pub scaling: ScalingParameters,
    /// Summary of the raw data.
    pub summary: DataSummary,
    /// Integrity checks on the raw data.
    pub integrity: IntegrityReport,
    /// RFC 3339 timestamp of the run.
    pub processed_at: String,
}

/// How a feature subset was chosen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionRecord {
    /// Requested number of features.
    pub k: usize,
    /// Variance pre-filter threshold, if applied.
    pub variance_threshold: Option<f64>,
    /// Samples used for scoring.
    pub scope: SelectionScope,
    /// Split fraction scoring was restricted by (train-only scope).
    pub test_fraction: f64,
    /// Split seed scoring was restricted by (train-only scope).
    pub seed: u64,
    /// Features entering the stage.
    pub n_input_features: usize,
    /// Features surviving the variance filter.
    pub n_after_variance: usize,
    /// Samples the ANOVA scores were computed on.
    pub n_scored_samples: usize,
}

/// Output of the feature selection stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReducedDataset {
    /// Cleaned matrix restricted to the selected features, in selection order.
    pub matrix: ExpressionMatrix,
    /// Labels in matrix sample order.
    pub labels: LabelVector,
    /// Selected features with their scores. `source_indices` point into the
    /// cleaned matrix.
    pub subset: FeatureSubset,
    /// Selection settings.
    pub selection: SelectionRecord,
}

/// Persisted record of a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    /// Sample indices of each partition.
    pub split: SplitIndices,
    /// Sample IDs in the training partition.
    pub train_samples: Vec<String>,
    /// Sample IDs in the test partition.
    pub test_samples: Vec<String>,
    /// Split seed.
    pub seed: u64,
    /// Held-out fraction.
    pub test_fraction: f64,
    /// Held-out results per model.
    pub comparison: ModelComparison,
    /// Name of the model with the best macro-F1.
    pub best_model: String,
    /// RFC 3339 timestamp of the run.
    pub trained_at: String,
}

/// Output of the training stage.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    /// The logistic regression used for interpretation.
    pub logistic: LinearModel,
    /// Best model by held-out macro-F1.
    pub best: SavedModel,
    /// Every trained model, in training order.
    pub models: Vec<SavedModel>,
    pub summary: TrainingSummary,
}

/// Output of the interpretation stage.
#[derive(Debug, Clone)]
pub struct InterpretationOutcome {
    /// Every feature ranked by maximum absolute coefficient.
    pub rankings: Vec<CoefficientRanking>,
    /// Top-ranked features with resolved symbols.
    pub panel: BiomarkerPanel,
    /// Largest-magnitude coefficients per class.
    pub class_top: BTreeMap<CancerType, Vec<(String, f64)>>,
    /// Dashboard data file contents.
    pub dashboard: DashboardData,
}

fn timestamp() -> String {
    chrono::Local::now().to_rfc3339()
}

/// Validate and standardize raw data.
///
/// Labels are aligned to the matrix first, then the raw values are checked
/// for integrity problems. Nothing is imputed: missing or non-finite values
/// and duplicate identifiers stop the stage.
///
/// # Arguments
/// * `raw` - Raw expression matrix (samples × genes)
/// * `labels` - Sample labels, in any order
///
/// # Returns
/// The standardized dataset with its scaling parameters and profiles.
pub fn clean(raw: &ExpressionMatrix, labels: &LabelVector) -> Result<CleanedDataset> {
    info!(
        "Cleaning {} samples x {} features",
        raw.n_samples(),
        raw.n_features()
    );
    let labels = align_labels(raw, labels)?;
    let integrity = profile_integrity(raw);
    integrity.ensure_clean()?;

    let summary = profile_summary(raw, &labels);
    for (class, count) in &summary.class_distribution {
        debug!("  {}: {} samples", class, count);
    }
    info!(
        "Values range {:.3} to {:.3}, class imbalance {:.2}",
        summary.min,
        summary.max,
        summary.imbalance_ratio()
    );

    let (matrix, scaling) = norm_zscore(raw)?;
    info!("Standardized {} features", scaling.n_features());

    Ok(CleanedDataset {
        matrix,
        labels,
        scaling,
        summary,
        integrity,
        processed_at: timestamp(),
    })
}

/// Keep the features that best separate the classes.
///
/// An optional variance pre-filter drops (near-)constant genes using the raw
/// variances recorded in the scaling parameters. The survivors are scored
/// with a one-way ANOVA F-test and the `k` highest-scoring are kept.
///
/// With [`SelectionScope::TrainOnly`] the scores are computed on the training
/// rows of the split that [`train`] will later draw with the same seed and
/// test fraction.
pub fn select_features(
    cleaned: &CleanedDataset,
    selection: &SelectionConfig,
    training: &TrainingConfig,
) -> Result<ReducedDataset> {
    let n_input = cleaned.matrix.n_features();
    let candidates: Vec<usize> = match selection.variance_threshold {
        Some(threshold) => filter_variance(&cleaned.scaling.variances(), threshold)?,
        None => (0..n_input).collect(),
    };
    if candidates.len() < n_input {
        info!(
            "Variance filter removed {} of {} features",
            n_input - candidates.len(),
            n_input
        );
    }
    let candidate_matrix = cleaned.matrix.subset_features(&candidates)?;

    let rows: Vec<usize> = match selection.scope {
        SelectionScope::FullCorpus => (0..cleaned.labels.len()).collect(),
        SelectionScope::TrainOnly => {
            split_stratified(&cleaned.labels, training.test_fraction, training.seed)?.train
        }
    };
    let scored = candidate_matrix.subset_samples(&rows)?;
    let scored_labels = cleaned.labels.subset(&rows)?;
    let groups = scored_labels.encode(&scored_labels.classes())?;

    let scores = anova_f(&scored, &groups)?;
    let mut subset = select_k_best(&scores, candidate_matrix.feature_ids(), selection.k)?;
    subset.source_indices = subset
        .source_indices
        .iter()
        .map(|&j| candidates[j])
        .collect();
    if subset.len() < selection.k {
        info!(
            "Requested {} features but only {} available; keeping all",
            selection.k,
            subset.len()
        );
    }
    info!(
        "Selected {} features scored on {} samples ({:?})",
        subset.len(),
        rows.len(),
        selection.scope
    );

    let matrix = cleaned.matrix.subset_features(&subset.source_indices)?;
    Ok(ReducedDataset {
        matrix,
        labels: cleaned.labels.clone(),
        subset,
        selection: SelectionRecord {
            k: selection.k,
            variance_threshold: selection.variance_threshold,
            scope: selection.scope,
            test_fraction: training.test_fraction,
            seed: training.seed,
            n_input_features: n_input,
            n_after_variance: candidates.len(),
            n_scored_samples: rows.len(),
        },
    })
}

fn fit_model(
    kind: ModelKind,
    x: &ExpressionMatrix,
    y: &[usize],
    classes: &[CancerType],
    config: &TrainingConfig,
) -> Result<SavedModel> {
    match kind {
        ModelKind::Logistic => Ok(SavedModel::Linear(model_logistic(
            x,
            y,
            classes,
            &config.logistic,
        )?)),
        ModelKind::Svm => Ok(SavedModel::Linear(model_svm(x, y, classes, &config.svm)?)),
        ModelKind::RandomForest => {
            let forest = ForestConfig {
                seed: config.forest.seed.or(Some(config.seed)),
                ..config.forest.clone()
            };
            Ok(SavedModel::Forest(model_forest(x, y, classes, &forest)?))
        }
    }
}

/// Fit and compare classifiers on a stratified train/test split.
///
/// Logistic regression is always fitted, since interpretation reads its
/// coefficients; the other configured models are fitted after it. Every
/// model is scored on the held-out partition and the one with the highest
/// macro-F1 is kept as the best (ties keep the earlier model).
///
/// # Arguments
/// * `reduced` - Output of [`select_features`]
/// * `config` - Split, model list and hyper-parameters
pub fn train(reduced: &ReducedDataset, config: &TrainingConfig) -> Result<TrainingOutcome> {
    let record = &reduced.selection;
    if record.scope == SelectionScope::TrainOnly
        && (record.seed != config.seed || record.test_fraction != config.test_fraction)
    {
        return Err(BiomarkerError::pipeline(
            "train",
            format!(
                "features were selected on the split (seed {}, test fraction {}) but training uses (seed {}, test fraction {})",
                record.seed, record.test_fraction, config.seed, config.test_fraction
            ),
        ));
    }

    let split = split_stratified(&reduced.labels, config.test_fraction, config.seed)?;
    info!(
        "Split {} samples into {} train / {} test (seed {})",
        reduced.labels.len(),
        split.train.len(),
        split.test.len(),
        config.seed
    );

    let classes = reduced.labels.classes();
    let x_train = reduced.matrix.subset_samples(&split.train)?;
    let y_train = reduced.labels.subset(&split.train)?.encode(&classes)?;
    let x_test = reduced.matrix.subset_samples(&split.test)?;
    let labels_test = reduced.labels.subset(&split.test)?;

    let mut kinds = vec![ModelKind::Logistic];
    kinds.extend(
        config
            .models
            .iter()
            .copied()
            .filter(|&k| k != ModelKind::Logistic),
    );

    let mut models = Vec::with_capacity(kinds.len());
    let mut evaluations = Vec::with_capacity(kinds.len());
    for kind in kinds {
        info!("Training {}", kind.name());
        let model = fit_model(kind, &x_train, &y_train, &classes, config)?;
        let evaluation = evaluate_model(&model, &x_test, &labels_test)?;
        info!(
            "  {}: accuracy {:.4}, macro-F1 {:.4}",
            evaluation.model, evaluation.accuracy, evaluation.macro_f1
        );
        models.push(model);
        evaluations.push(evaluation);
    }

    let comparison = ModelComparison { evaluations };
    let best_index = select_best_model(&comparison.evaluations)
        .ok_or_else(|| BiomarkerError::pipeline("train", "no models were trained"))?;
    let best = models[best_index].clone();
    info!("Best model: {}", best.name());

    let logistic = match &models[0] {
        SavedModel::Linear(m) => m.clone(),
        SavedModel::Forest(_) => {
            return Err(BiomarkerError::pipeline(
                "train",
                "first model is not the logistic regression",
            ))
        }
    };

    let summary = TrainingSummary {
        train_samples: split
            .train
            .iter()
            .map(|&i| reduced.labels.sample_ids()[i].clone())
            .collect(),
        test_samples: labels_test.sample_ids().to_vec(),
        split,
        seed: config.seed,
        test_fraction: config.test_fraction,
        best_model: best.name().to_string(),
        comparison,
        trained_at: timestamp(),
    };

    Ok(TrainingOutcome {
        logistic,
        best,
        models,
        summary,
    })
}

/// Rank features by the linear model's coefficients and build the panel.
///
/// # Arguments
/// * `model` - Trained logistic regression
/// * `config` - Panel size and per-class list length
/// * `resolver` - Gene identifier to symbol lookup
pub fn interpret<R: SymbolResolver + ?Sized>(
    model: &LinearModel,
    config: &InterpretationConfig,
    resolver: &R,
) -> Result<InterpretationOutcome> {
    let rankings = rank_coefficients(model)?;
    let panel = select_panel(&rankings, config.panel_size, resolver)?;
    info!(
        "Panel of {} features from {}; {:.1}% resolved to symbols",
        panel.len(),
        rankings.len(),
        panel.resolution_rate() * 100.0
    );
    let class_top = top_features_per_class(model, config.per_class_top);
    let dashboard = dashboard_data(&panel, &rankings, &model.classes);
    Ok(InterpretationOutcome {
        rankings,
        panel,
        class_top,
        dashboard,
    })
}
