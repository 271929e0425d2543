//! Stage wiring, configuration and persistence for the biomarker pipeline.

pub mod config;
pub mod predict;
mod runner;
pub mod stages;

pub use config::{
    ArtifactLayout, CleaningConfig, InterpretationConfig, PathsConfig, PipelineConfig,
    SelectionConfig, SelectionScope, TrainingConfig,
};
pub use predict::{write_predictions_tsv, Prediction, Predictor};
pub use runner::{Pipeline, RunSummary, Stage};
pub use stages::{
    clean, interpret, select_features, train, CleanedDataset, InterpretationOutcome,
    ReducedDataset, SelectionRecord, TrainingOutcome, TrainingSummary,
};
