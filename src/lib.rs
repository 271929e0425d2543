//! RNA-Seq Cancer Biomarker Discovery Library
//!
//! This library provides the stages of a pan-cancer biomarker pipeline:
//! gene-expression ingestion and standardization, ANOVA feature selection,
//! multi-class classification, and interpretation of linear model
//! coefficients as a ranked biomarker panel.
//!
//! # Overview
//!
//! The library is organized into composable modules:
//!
//! - **data**: Core data structures (ExpressionMatrix, LabelVector, artifacts)
//! - **profile**: Data profiling (integrity checks, summary statistics)
//! - **normalize**: Per-feature z-score standardization
//! - **filter**: Feature filtering (variance, ANOVA F-test)
//! - **model**: Classifiers (logistic regression, linear SVM, random forest)
//! - **evaluate**: Classification metrics (accuracy, macro-F1)
//! - **interpret**: Coefficient ranking, biomarker panel, symbol resolution
//! - **pipeline**: Stage wiring, configuration and persistence
//! - **benchmark**: Synthetic datasets with known ground truth
//!
//! # Example
//!
//! ```no_run
//! use rnaseq_biomarker::prelude::*;
//!
//! // Load data
//! let raw = ExpressionMatrix::from_csv("data/raw/data.csv").unwrap();
//! let labels = LabelVector::from_csv("data/raw/labels.csv", "Class").unwrap();
//!
//! // Run the stages in memory
//! let config = PipelineConfig::default();
//! let cleaned = clean(&raw, &labels).unwrap();
//! let reduced = select_features(&cleaned, &config.selection, &config.training).unwrap();
//! let trained = train(&reduced, &config.training).unwrap();
//! let outcome = interpret(
//!     &trained.logistic,
//!     &config.interpretation,
//!     &SymbolTable::builtin(),
//! )
//! .unwrap();
//! println!("{}", outcome.panel);
//! ```

pub mod benchmark;
pub mod data;
pub mod error;
pub mod evaluate;
pub mod filter;
pub mod interpret;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod profile;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::benchmark::{generate_synthetic, SyntheticConfig, SyntheticData};
    pub use crate::data::{
        align_labels, load_json, save_json, CancerType, ExpressionMatrix, LabelVector,
    };
    pub use crate::error::{BiomarkerError, Result};
    pub use crate::evaluate::{
        classification_report, ClassMetrics, ClassificationReport, ConfusionMatrix,
    };
    pub use crate::filter::{anova_f, filter_variance, select_k_best, AnovaScores, FeatureSubset};
    pub use crate::interpret::{
        dashboard_data, rank_coefficients, select_panel, top_features_per_class, BiomarkerPanel,
        CoefficientRanking, DashboardData, PanelEntry, Resolution, SymbolResolver, SymbolTable,
    };
    pub use crate::model::{
        evaluate_model, model_forest, model_logistic, model_svm, select_best_model,
        split_stratified, ClassWeights, Classifier, ForestConfig, LinearKind, LinearModel,
        LogisticConfig, ModelComparison, ModelEvaluation, ModelKind, RandomForest, SavedModel,
        SplitIndices, SvmConfig,
    };
    pub use crate::normalize::{norm_zscore, ScalingParameters};
    pub use crate::pipeline::{
        clean, interpret, select_features, train, CleanedDataset, InterpretationConfig,
        InterpretationOutcome, Pipeline, PipelineConfig, Prediction, Predictor, ReducedDataset,
        RunSummary, SelectionConfig, SelectionScope, Stage, TrainingConfig, TrainingOutcome,
    };
    pub use crate::profile::{profile_integrity, profile_summary, DataSummary, IntegrityReport};
}
