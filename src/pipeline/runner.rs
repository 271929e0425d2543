//! File-level driver: loads each stage's inputs, runs it, persists its outputs.

use crate::data::{
    align_labels, load_json, save_json, ExpressionMatrix, LabelVector, StagedFiles,
};
use crate::error::{BiomarkerError, Result};
use crate::interpret::{
    write_class_top_tsv, write_dashboard_json, write_panel_tsv, write_rankings_tsv,
    write_symbol_list, SymbolTable,
};
use crate::model::{LinearModel, SavedModel};
use crate::pipeline::config::{ArtifactLayout, PipelineConfig};
use crate::pipeline::predict::{write_predictions_tsv, Prediction, Predictor};
use crate::pipeline::stages::{
    clean, interpret, select_features, train, CleanedDataset, InterpretationOutcome,
    ReducedDataset, TrainingOutcome,
};
use crate::profile::{profile_integrity, profile_summary, DataSummary, IntegrityReport};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Clean,
    Select,
    Train,
    Interpret,
}

impl Stage {
    /// Every stage in execution order.
    pub const ALL: [Stage; 4] = [Stage::Clean, Stage::Select, Stage::Train, Stage::Interpret];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Clean => "clean",
            Stage::Select => "select",
            Stage::Train => "train",
            Stage::Interpret => "interpret",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn log_failure(stage: Stage) -> impl Fn(&BiomarkerError) {
    move |e| error!("Stage {} failed: {}", stage, e)
}

/// Headline numbers from a full run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub n_samples: usize,
    pub n_features: usize,
    pub n_selected: usize,
    pub best_model: String,
    pub best_accuracy: f64,
    pub best_macro_f1: f64,
    pub panel_size: usize,
    pub resolved: usize,
    pub output_dir: PathBuf,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Pipeline Summary")?;
        writeln!(f, "================")?;
        writeln!(f, "Samples: {}", self.n_samples)?;
        writeln!(f, "Features: {} -> {} selected", self.n_features, self.n_selected)?;
        writeln!(
            f,
            "Best model: {} (accuracy {:.4}, macro-F1 {:.4})",
            self.best_model, self.best_accuracy, self.best_macro_f1
        )?;
        writeln!(
            f,
            "Biomarker panel: {} genes, {} with symbols",
            self.panel_size, self.resolved
        )?;
        writeln!(f, "Outputs: {}", self.output_dir.display())
    }
}

/// Runs stages against files, using a [`PipelineConfig`] for defaults.
///
/// Every `run_*` method accepts optional path overrides; `None` falls back
/// to the configured input paths and the artifact layout of the output
/// directory. Outputs are written only after the stage has succeeded, and
/// a stage's files appear together or not at all.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    layout: ArtifactLayout,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl Pipeline {
    /// Create a pipeline from a config.
    pub fn new(config: PipelineConfig) -> Self {
        let layout = config.layout();
        Self { config, layout }
    }

    /// Redirect all outputs to another directory.
    pub fn output_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.config.paths.output_dir = dir.as_ref().to_path_buf();
        self.layout = self.config.layout();
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    fn load_raw(
        &self,
        data: Option<&Path>,
        labels: Option<&Path>,
    ) -> Result<(ExpressionMatrix, LabelVector)> {
        let data = data.unwrap_or(self.config.paths.data.as_path());
        let labels = labels.unwrap_or(self.config.paths.labels.as_path());
        info!("Loading expression data from {}", data.display());
        let matrix = ExpressionMatrix::from_csv(data)?;
        info!("Loading labels from {}", labels.display());
        let labels = LabelVector::from_csv(labels, &self.config.cleaning.label_column)?;
        Ok((matrix, labels))
    }

    /// Profile raw inputs without running any stage.
    pub fn profile(
        &self,
        data: Option<&Path>,
        labels: Option<&Path>,
    ) -> Result<(IntegrityReport, DataSummary)> {
        let (matrix, labels) = self.load_raw(data, labels)?;
        let labels = align_labels(&matrix, &labels)?;
        Ok((profile_integrity(&matrix), profile_summary(&matrix, &labels)))
    }

    /// Stage 1: raw CSV → `cleaned.json` (+ `scaling.json`).
    pub fn run_clean(
        &self,
        data: Option<&Path>,
        labels: Option<&Path>,
        output: Option<&Path>,
    ) -> Result<CleanedDataset> {
        let (matrix, labels) = self.load_raw(data, labels)?;
        let cleaned = clean(&matrix, &labels)?;

        let output = output.map_or_else(|| self.layout.cleaned(), Path::to_path_buf);
        let scaling = output.with_file_name("scaling.json");
        let mut staged = StagedFiles::new();
        save_json(&cleaned, staged.stage(&output)?)?;
        save_json(&cleaned.scaling, staged.stage(&scaling)?)?;
        staged.commit()?;
        info!("Wrote {} and {}", output.display(), scaling.display());
        Ok(cleaned)
    }

    /// Stage 2: `cleaned.json` → `reduced.json`.
    pub fn run_select(&self, input: Option<&Path>, output: Option<&Path>) -> Result<ReducedDataset> {
        let input = input.map_or_else(|| self.layout.cleaned(), Path::to_path_buf);
        let cleaned: CleanedDataset = load_json(&input)?;
        let reduced = select_features(&cleaned, &self.config.selection, &self.config.training)?;

        let output = output.map_or_else(|| self.layout.reduced(), Path::to_path_buf);
        let mut staged = StagedFiles::new();
        save_json(&reduced, staged.stage(&output)?)?;
        staged.commit()?;
        info!("Wrote {}", output.display());
        Ok(reduced)
    }

    /// Stage 3: `reduced.json` → models, comparison table and training summary.
    pub fn run_train(
        &self,
        input: Option<&Path>,
        output_dir: Option<&Path>,
    ) -> Result<TrainingOutcome> {
        let input = input.map_or_else(|| self.layout.reduced(), Path::to_path_buf);
        let reduced: ReducedDataset = load_json(&input)?;
        let outcome = train(&reduced, &self.config.training)?;

        let layout = output_dir.map_or_else(|| self.layout.clone(), ArtifactLayout::new);
        let mut staged = StagedFiles::new();
        save_json(&outcome.logistic, staged.stage(layout.model())?)?;
        save_json(&outcome.best, staged.stage(layout.best_model())?)?;
        save_json(&outcome.summary, staged.stage(layout.training_summary())?)?;
        outcome
            .summary
            .comparison
            .to_tsv(staged.stage(layout.comparison())?)?;
        staged.commit()?;
        info!("Wrote models and reports to {}", layout.root().display());
        Ok(outcome)
    }

    /// Stage 4: `model.json` → biomarker panel and reports.
    pub fn run_interpret(
        &self,
        model: Option<&Path>,
        output_dir: Option<&Path>,
    ) -> Result<InterpretationOutcome> {
        let model_path = model.map_or_else(|| self.layout.model(), Path::to_path_buf);
        let model: LinearModel = load_json(&model_path)?;
        let resolver = match &self.config.paths.symbol_table {
            Some(path) => SymbolTable::from_tsv(path)?,
            None => SymbolTable::builtin(),
        };
        let outcome = interpret(&model, &self.config.interpretation, &resolver)?;

        let layout = output_dir.map_or_else(|| self.layout.clone(), ArtifactLayout::new);
        let mut staged = StagedFiles::new();
        write_panel_tsv(&outcome.panel, staged.stage(layout.panel())?)?;
        write_rankings_tsv(
            &outcome.rankings,
            &model.classes,
            staged.stage(layout.rankings())?,
        )?;
        write_class_top_tsv(&outcome.class_top, staged.stage(layout.class_top())?)?;
        write_dashboard_json(&outcome.dashboard, staged.stage(layout.dashboard())?)?;
        write_symbol_list(&outcome.panel, staged.stage(layout.symbols())?)?;
        staged.commit()?;
        info!("Wrote biomarker reports to {}", layout.root().display());
        Ok(outcome)
    }

    /// Run all four stages in order.
    ///
    /// A failing stage stops the run; artifacts of earlier stages remain.
    pub fn run(&self) -> Result<RunSummary> {
        info!("[1/4] {}", Stage::Clean);
        let cleaned = self
            .run_clean(None, None, None)
            .inspect_err(log_failure(Stage::Clean))?;

        info!("[2/4] {}", Stage::Select);
        let reduced = self
            .run_select(None, None)
            .inspect_err(log_failure(Stage::Select))?;

        info!("[3/4] {}", Stage::Train);
        let trained = self
            .run_train(None, None)
            .inspect_err(log_failure(Stage::Train))?;

        info!("[4/4] {}", Stage::Interpret);
        let interpreted = self
            .run_interpret(None, None)
            .inspect_err(log_failure(Stage::Interpret))?;

        let best = trained
            .summary
            .comparison
            .best()
            .ok_or_else(|| BiomarkerError::pipeline("run", "training produced no evaluations"))?;
        Ok(RunSummary {
            n_samples: cleaned.matrix.n_samples(),
            n_features: cleaned.matrix.n_features(),
            n_selected: reduced.subset.len(),
            best_model: best.model.clone(),
            best_accuracy: best.accuracy,
            best_macro_f1: best.macro_f1,
            panel_size: interpreted.panel.len(),
            resolved: interpreted.panel.symbols().len(),
            output_dir: self.layout.root().to_path_buf(),
        })
    }

    /// Classify a new raw matrix with persisted scaling and the best model.
    pub fn predict(
        &self,
        data: &Path,
        scaling: Option<&Path>,
        model: Option<&Path>,
        output: Option<&Path>,
    ) -> Result<Vec<Prediction>> {
        let scaling = scaling.map_or_else(|| self.layout.scaling(), Path::to_path_buf);
        let model = model.map_or_else(|| self.layout.best_model(), Path::to_path_buf);
        let predictor = Predictor::new(load_json(&scaling)?, load_json::<SavedModel, _>(&model)?)?;
        let raw = ExpressionMatrix::from_csv(data)?;
        let predictions = predictor.predict(&raw)?;

        let output = output.map_or_else(|| self.layout.predictions(), Path::to_path_buf);
        let mut staged = StagedFiles::new();
        write_predictions_tsv(&predictions, staged.stage(&output)?)?;
        staged.commit()?;
        info!("Wrote {}", output.display());
        Ok(predictions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order() {
        let names: Vec<&str> = Stage::ALL.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["clean", "select", "train", "interpret"]);
    }

    #[test]
    fn test_output_dir_override() {
        let pipeline = Pipeline::default().output_dir("elsewhere");
        assert_eq!(pipeline.layout().model(), PathBuf::from("elsewhere/model.json"));
        assert_eq!(pipeline.config().paths.output_dir, PathBuf::from("elsewhere"));
    }

    #[test]
    fn test_missing_input_writes_nothing() {
        let dir = tempfile::TempDir::new().unwrap();
        let pipeline = Pipeline::default().output_dir(dir.path());
        let missing = dir.path().join("absent.json");
        assert!(pipeline.run_select(Some(&missing), None).is_err());
        assert!(!pipeline.layout().reduced().exists());
    }
}
