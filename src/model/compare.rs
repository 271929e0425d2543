//! Held-out evaluation and comparison of trained classifiers.
//!
//! Models are ranked by macro-averaged F1 so that small classes count as much
//! as large ones. Ties keep the earlier model.

use crate::data::{ExpressionMatrix, LabelVector};
use crate::error::Result;
use crate::evaluate::{classification_report, ClassificationReport};
use crate::model::classifier::Classifier;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Held-out performance of one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEvaluation {
    /// Model name.
    pub model: String,
    /// Test-set accuracy.
    pub accuracy: f64,
    /// Test-set macro-F1.
    pub macro_f1: f64,
    /// Per-class breakdown.
    pub report: ClassificationReport,
}

/// Evaluate a model on labelled data.
pub fn evaluate_model<C: Classifier + ?Sized>(
    model: &C,
    x: &ExpressionMatrix,
    labels: &LabelVector,
) -> Result<ModelEvaluation> {
    let y_true = labels.encode(model.classes())?;
    let y_pred = model.predict(x)?;
    let report = classification_report(&y_true, &y_pred, model.classes())?;
    Ok(ModelEvaluation {
        model: model.name().to_string(),
        accuracy: report.accuracy,
        macro_f1: report.macro_f1,
        report,
    })
}

/// Index of the evaluation with the highest macro-F1 (first on ties).
pub fn select_best_model(evaluations: &[ModelEvaluation]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, eval) in evaluations.iter().enumerate() {
        match best {
            Some(b) if evaluations[b].macro_f1 >= eval.macro_f1 => {}
            _ => best = Some(i),
        }
    }
    best
}

/// Side-by-side results for every trained model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelComparison {
    /// Evaluations in training order.
    pub evaluations: Vec<ModelEvaluation>,
}

impl ModelComparison {
    /// The best evaluation by macro-F1.
    pub fn best(&self) -> Option<&ModelEvaluation> {
        select_best_model(&self.evaluations).map(|i| &self.evaluations[i])
    }

    /// Write the comparison table (model, accuracy, macro_f1) as TSV.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "model\taccuracy\tmacro_f1")?;
        for eval in &self.evaluations {
            writeln!(writer, "{}\t{:.6}\t{:.6}", eval.model, eval.accuracy, eval.macro_f1)?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl fmt::Display for ModelComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let best = self.best().map(|e| e.model.as_str());
        writeln!(f, "Model Comparison")?;
        writeln!(f, "  {:<22} {:>9} {:>9}", "model", "accuracy", "macro_f1")?;
        for eval in &self.evaluations {
            let marker = if Some(eval.model.as_str()) == best { " *" } else { "" };
            writeln!(
                f,
                "  {:<22} {:>9.4} {:>9.4}{}",
                eval.model, eval.accuracy, eval.macro_f1, marker
            )?;
        }
        Ok(())
    }
}
