//! Offline batch classification of new raw samples.

use crate::data::{load_json, CancerType, ExpressionMatrix};
use crate::error::{BiomarkerError, Result};
use crate::model::{Classifier, SavedModel};
use crate::normalize::ScalingParameters;
use crate::profile::profile_integrity;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Predicted class for one sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    pub sample_id: String,
    pub predicted: CancerType,
}

/// Applies persisted scaling and a trained model to raw expression data.
#[derive(Debug, Clone)]
pub struct Predictor {
    scaling: ScalingParameters,
    model: SavedModel,
}

impl Predictor {
    /// Pair scaling parameters with a model.
    ///
    /// Every feature the model reads must be covered by the scaling.
    pub fn new(scaling: ScalingParameters, model: SavedModel) -> Result<Self> {
        if let Some(missing) = model
            .feature_ids()
            .iter()
            .find(|id| !scaling.feature_ids.contains(id))
        {
            return Err(BiomarkerError::MissingColumn(missing.clone()));
        }
        Ok(Self { scaling, model })
    }

    /// Load scaling parameters and a saved model from their JSON artifacts.
    pub fn from_artifacts<P: AsRef<Path>, Q: AsRef<Path>>(scaling: P, model: Q) -> Result<Self> {
        Self::new(load_json(scaling)?, load_json(model)?)
    }

    /// The model used for prediction.
    pub fn model(&self) -> &SavedModel {
        &self.model
    }

    /// Classify every sample of a raw matrix.
    ///
    /// The raw matrix may hold extra columns or a different column order; the
    /// scaled features are looked up by ID. Missing or non-finite values are
    /// rejected as in the cleaning stage.
    pub fn predict(&self, raw: &ExpressionMatrix) -> Result<Vec<Prediction>> {
        let raw = raw.select_feature_ids(&self.scaling.feature_ids)?;
        profile_integrity(&raw).ensure_clean()?;
        let scaled = self.scaling.transform(&raw)?;
        let x = scaled.select_feature_ids(self.model.feature_ids())?;
        let labels = self.model.predict_labels(&x)?;
        info!(
            "Classified {} samples with {}",
            labels.len(),
            self.model.name()
        );
        Ok(x
            .sample_ids()
            .iter()
            .zip(labels)
            .map(|(sample_id, predicted)| Prediction {
                sample_id: sample_id.clone(),
                predicted,
            })
            .collect())
    }
}

/// Write predictions as TSV (`sample_id`, `predicted_class`).
pub fn write_predictions_tsv<P: AsRef<Path>>(predictions: &[Prediction], path: P) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, "sample_id\tpredicted_class")?;
    for p in predictions {
        writeln!(writer, "{}\t{}", p.sample_id, p.predicted)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LinearKind, LinearModel};
    use nalgebra::DMatrix;

    fn predictor() -> Predictor {
        let scaling = ScalingParameters {
            feature_ids: vec!["gene_0".into(), "gene_1".into()],
            means: vec![10.0, 0.0],
            stds: vec![2.0, 1.0],
        };
        let model = LinearModel {
            kind: LinearKind::Logistic,
            classes: vec![CancerType::BRCA, CancerType::PRAD],
            feature_ids: vec!["gene_0".into()],
            coefficients: vec![vec![-1.0], vec![1.0]],
            intercepts: vec![0.0, 0.0],
        };
        Predictor::new(scaling, SavedModel::Linear(model)).unwrap()
    }

    #[test]
    fn test_predict_reorders_columns() {
        let raw = ExpressionMatrix::new(
            DMatrix::from_row_slice(2, 3, &[0.0, 6.0, 1.0, 0.0, 14.0, 1.0]),
            vec!["s0".into(), "s1".into()],
            vec!["gene_1".into(), "gene_0".into(), "gene_9".into()],
        )
        .unwrap();
        let predictions = predictor().predict(&raw).unwrap();
        assert_eq!(predictions[0].predicted, CancerType::BRCA);
        assert_eq!(predictions[1].predicted, CancerType::PRAD);
        assert_eq!(predictions[1].sample_id, "s1");
    }

    #[test]
    fn test_predict_missing_feature() {
        let raw = ExpressionMatrix::new(
            DMatrix::from_element(1, 1, 3.0),
            vec!["s0".into()],
            vec!["gene_0".into()],
        )
        .unwrap();
        let err = predictor().predict(&raw).unwrap_err();
        assert!(matches!(err, BiomarkerError::MissingColumn(_)));
    }

    #[test]
    fn test_new_rejects_unscaled_feature() {
        let scaling = ScalingParameters {
            feature_ids: vec!["gene_1".into()],
            means: vec![0.0],
            stds: vec![1.0],
        };
        let err = Predictor::new(scaling, predictor().model().clone()).unwrap_err();
        assert!(matches!(err, BiomarkerError::MissingColumn(_)));
    }
}
