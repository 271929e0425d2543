//! Integration tests for the four-stage biomarker pipeline.

use approx::assert_relative_eq;
use nalgebra::DMatrix;
use rnaseq_biomarker::interpret::Resolution;
use rnaseq_biomarker::pipeline::ArtifactLayout;
use rnaseq_biomarker::prelude::*;
use std::collections::HashSet;
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

/// 10 samples × 5 genes, two classes separated by gene_0 only.
///
/// gene_1..gene_4 repeat the same pattern in both classes, so their class
/// means are equal.
fn separable_dataset() -> (ExpressionMatrix, LabelVector) {
    let pattern = [0.3, 1.1, 0.7, 1.9, 0.5];
    let data = DMatrix::from_fn(10, 5, |i, j| {
        if j == 0 {
            if i < 5 {
                1.0 + 0.1 * i as f64
            } else {
                10.0 + 0.1 * i as f64
            }
        } else {
            2.0 * j as f64 + pattern[(i % 5 + j) % 5]
        }
    });
    let sample_ids: Vec<String> = (0..10).map(|i| format!("sample_{}", i)).collect();
    let matrix = ExpressionMatrix::new(
        data,
        sample_ids.clone(),
        (0..5).map(|j| format!("gene_{}", j)).collect(),
    )
    .unwrap();
    let labels = LabelVector::new(
        sample_ids,
        (0..10)
            .map(|i| if i < 5 { CancerType::BRCA } else { CancerType::LUAD })
            .collect(),
    )
    .unwrap();
    (matrix, labels)
}

fn synthetic() -> SyntheticData {
    let config = SyntheticConfig::new("integration")
        .with_classes(&CancerType::ALL, 12)
        .with_features(60, 4)
        .with_effect(3.0, 0.8)
        .with_silent(2);
    generate_synthetic(&config).unwrap()
}

#[test]
fn test_separable_end_to_end() {
    let (raw, labels) = separable_dataset();
    let config = PipelineConfig::default();

    let cleaned = clean(&raw, &labels).unwrap();
    let reduced = select_features(&cleaned, &config.selection, &config.training).unwrap();
    assert_eq!(reduced.subset.len(), 5);
    assert_eq!(reduced.subset.feature_ids[0], "gene_0");

    let trained = train(&reduced, &config.training).unwrap();
    let logistic = &trained.summary.comparison.evaluations[0];
    assert_eq!(logistic.model, "logistic_regression");
    assert_eq!(logistic.accuracy, 1.0);
    assert_eq!(logistic.macro_f1, 1.0);
    assert_eq!(trained.summary.comparison.best().unwrap().macro_f1, 1.0);
    assert_eq!(trained.summary.comparison.evaluations.len(), 3);

    let outcome = interpret(
        &trained.logistic,
        &config.interpretation,
        &SymbolTable::builtin(),
    )
    .unwrap();
    assert_eq!(outcome.panel.len(), 5);
    assert_eq!(outcome.panel.entries[0].gene_id, "gene_0");
    assert_eq!(outcome.panel.entries[0].rank, 1);
}

#[test]
fn test_cleaned_matrix_is_standardized() {
    let data = synthetic();
    let cleaned = clean(&data.matrix, &data.labels).unwrap();
    let n = data.matrix.n_features();
    for (j, (mean, sd)) in cleaned.matrix.column_moments().into_iter().enumerate() {
        assert_relative_eq!(mean, 0.0, epsilon = 1e-9);
        if j < n - 2 {
            assert_relative_eq!(sd, 1.0, epsilon = 1e-9);
        } else {
            // silent genes stay at zero
            assert_eq!(sd, 0.0);
        }
    }
}

#[test]
fn test_selection_returns_top_k() {
    let data = synthetic();
    let cleaned = clean(&data.matrix, &data.labels).unwrap();
    let training = TrainingConfig::default();

    let selection = SelectionConfig {
        k: 15,
        ..SelectionConfig::default()
    };
    let reduced = select_features(&cleaned, &selection, &training).unwrap();
    assert_eq!(reduced.subset.len(), 15);
    let all: HashSet<&String> = cleaned.matrix.feature_ids().iter().collect();
    assert!(reduced.subset.feature_ids.iter().all(|id| all.contains(id)));
    assert!(reduced
        .subset
        .scores
        .windows(2)
        .all(|w| w[0] >= w[1]));

    let selection = SelectionConfig {
        k: 10_000,
        ..SelectionConfig::default()
    };
    let reduced = select_features(&cleaned, &selection, &training).unwrap();
    // every expressed gene; the silent ones fail the variance filter
    assert_eq!(reduced.subset.len(), 60);
}

#[test]
fn test_selection_recovers_informative_genes() {
    let data = synthetic();
    let cleaned = clean(&data.matrix, &data.labels).unwrap();
    let selection = SelectionConfig {
        k: 20,
        ..SelectionConfig::default()
    };
    let reduced = select_features(&cleaned, &selection, &TrainingConfig::default()).unwrap();
    let informative: HashSet<&String> = data.informative_features.values().flatten().collect();
    assert_eq!(informative.len(), 20);
    let hits = reduced
        .subset
        .feature_ids
        .iter()
        .filter(|id| informative.contains(id))
        .count();
    assert!(hits >= 18, "only {} informative genes selected", hits);
}

#[test]
fn test_default_panel_truncates_and_fills_dashboard() {
    let data = synthetic();
    let mut config = PipelineConfig::default();
    config.selection.k = 55;
    config.training.models = vec![ModelKind::Logistic];

    let cleaned = clean(&data.matrix, &data.labels).unwrap();
    let reduced = select_features(&cleaned, &config.selection, &config.training).unwrap();
    assert_eq!(reduced.subset.len(), 55);
    let trained = train(&reduced, &config.training).unwrap();
    assert_eq!(trained.logistic.feature_ids.len(), 55);

    let outcome = interpret(
        &trained.logistic,
        &config.interpretation,
        &SymbolTable::builtin(),
    )
    .unwrap();
    assert_eq!(config.interpretation.panel_size, 50);
    assert_eq!(outcome.rankings.len(), 55);
    assert_eq!(outcome.panel.entries.len(), 50);
    assert_eq!(outcome.panel.total_features, 55);
    let ids: HashSet<&String> = outcome.panel.entries.iter().map(|e| &e.gene_id).collect();
    assert_eq!(ids.len(), 50);
    assert!(outcome
        .panel
        .entries
        .windows(2)
        .all(|w| w[0].coefficient.abs() >= w[1].coefficient.abs()));

    let dashboard = &outcome.dashboard;
    assert_eq!(dashboard.metadata.total_genes_analyzed, 55);
    assert_eq!(dashboard.metadata.title, "Top 50 Cancer Biomarkers");
    assert_eq!(dashboard.biomarkers.len(), 50);
    for (i, (item, entry)) in dashboard
        .biomarkers
        .iter()
        .zip(&outcome.panel.entries)
        .enumerate()
    {
        assert_eq!(item.rank, i + 1);
        assert_eq!(item.gene_id, entry.gene_id);
        assert_eq!(item.dominant_class, entry.dominant_class);
        let expected = entry.symbol.symbol().unwrap_or(entry.gene_id.as_str());
        assert_eq!(item.hgnc_symbol, expected);
        assert_eq!(item.coefficients.len(), CancerType::ALL.len());
        assert_relative_eq!(item.max_abs_coef, item.dominant_coef.abs(), epsilon = 1e-4);
    }
}

#[test]
fn test_training_is_deterministic() {
    let data = synthetic();
    let config = PipelineConfig::default();
    let run = || {
        let cleaned = clean(&data.matrix, &data.labels).unwrap();
        let reduced = select_features(&cleaned, &config.selection, &config.training).unwrap();
        train(&reduced, &config.training).unwrap()
    };
    let a = run();
    let b = run();
    assert_eq!(a.summary.split, b.summary.split);
    assert_eq!(a.summary.comparison, b.summary.comparison);
    assert_eq!(a.logistic, b.logistic);
    assert_eq!(a.best, b.best);
}

#[test]
fn test_train_only_scope_ignores_held_out_rows() {
    let data = synthetic();
    let cleaned = clean(&data.matrix, &data.labels).unwrap();
    let training = TrainingConfig::default();
    let selection = SelectionConfig {
        k: 10,
        scope: SelectionScope::TrainOnly,
        ..SelectionConfig::default()
    };
    let before = select_features(&cleaned, &selection, &training).unwrap();

    // Scramble every held-out row.
    let split = split_stratified(&cleaned.labels, training.test_fraction, training.seed).unwrap();
    let mut values = cleaned.matrix.data().clone();
    for &i in &split.test {
        for j in 0..values.ncols() {
            values[(i, j)] = ((i * 31 + j * 17) % 13) as f64 - 6.0;
        }
    }
    let mut tampered = cleaned.clone();
    tampered.matrix = cleaned.matrix.with_data(values).unwrap();

    let after = select_features(&tampered, &selection, &training).unwrap();
    assert_eq!(before.subset.feature_ids, after.subset.feature_ids);
    assert_eq!(before.subset.scores, after.subset.scores);
    assert_eq!(before.selection.n_scored_samples, split.train.len());

    let full = SelectionConfig {
        scope: SelectionScope::FullCorpus,
        ..selection
    };
    let full_before = select_features(&cleaned, &full, &training).unwrap();
    let full_after = select_features(&tampered, &full, &training).unwrap();
    assert_ne!(full_before.subset.scores, full_after.subset.scores);
}

#[test]
fn test_artifacts_roundtrip_bit_identical() {
    let dir = TempDir::new().unwrap();
    let data = synthetic();
    let config = PipelineConfig::default();
    let cleaned = clean(&data.matrix, &data.labels).unwrap();
    let reduced = select_features(&cleaned, &config.selection, &config.training).unwrap();
    let trained = train(&reduced, &config.training).unwrap();

    let path = dir.path().join("cleaned.json");
    save_json(&cleaned, &path).unwrap();
    let back: CleanedDataset = load_json(&path).unwrap();
    assert_eq!(back, cleaned);
    let bits = |m: &ExpressionMatrix| m.data().iter().map(|v| v.to_bits()).collect::<Vec<_>>();
    assert_eq!(bits(&back.matrix), bits(&cleaned.matrix));

    let path = dir.path().join("reduced.json");
    save_json(&reduced, &path).unwrap();
    let back: ReducedDataset = load_json(&path).unwrap();
    assert_eq!(back, reduced);
    assert_eq!(bits(&back.matrix), bits(&reduced.matrix));

    let path = dir.path().join("model.json");
    save_json(&trained.logistic, &path).unwrap();
    let back: LinearModel = load_json(&path).unwrap();
    assert_eq!(back, trained.logistic);

    let path = dir.path().join("best_model.json");
    save_json(&trained.best, &path).unwrap();
    let back: SavedModel = load_json(&path).unwrap();
    assert_eq!(back, trained.best);
}

#[test]
fn test_missing_values_are_fatal() {
    let dir = TempDir::new().unwrap();
    let mut data_file = NamedTempFile::new().unwrap();
    writeln!(data_file, "sample_id,gene_0,gene_1").unwrap();
    writeln!(data_file, "s0,1.0,2.0").unwrap();
    writeln!(data_file, "s1,NA,3.0").unwrap();
    writeln!(data_file, "s2,4.0,1.0").unwrap();
    let mut labels_file = NamedTempFile::new().unwrap();
    writeln!(labels_file, "sample_id,Class").unwrap();
    writeln!(labels_file, "s0,BRCA").unwrap();
    writeln!(labels_file, "s1,LUAD").unwrap();
    writeln!(labels_file, "s2,BRCA").unwrap();

    let pipeline = Pipeline::default().output_dir(dir.path());
    let err = pipeline
        .run_clean(Some(data_file.path()), Some(labels_file.path()), None)
        .unwrap_err();
    assert!(matches!(err, BiomarkerError::MissingValues { total: 1, .. }));
    assert!(err.is_integrity());
    assert!(!pipeline.layout().cleaned().exists());
}

#[test]
fn test_failed_training_write_leaves_no_artifacts() {
    let data = synthetic();
    let dir = TempDir::new().unwrap();
    let config = PipelineConfig::default();
    let cleaned = clean(&data.matrix, &data.labels).unwrap();
    let selection = SelectionConfig {
        k: 10,
        ..SelectionConfig::default()
    };
    let reduced = select_features(&cleaned, &selection, &config.training).unwrap();
    let reduced_path = dir.path().join("reduced.json");
    save_json(&reduced, &reduced_path).unwrap();

    let out = dir.path().join("out");
    let layout = ArtifactLayout::new(&out);
    std::fs::create_dir_all(layout.training_summary()).unwrap();

    let pipeline = Pipeline::new(config);
    let result = pipeline.run_train(Some(reduced_path.as_path()), Some(out.as_path()));
    assert!(result.is_err());
    assert!(!layout.model().exists());
    assert!(!layout.best_model().exists());
    assert!(!layout.comparison().exists());
    let entries: Vec<_> = std::fs::read_dir(&out).unwrap().collect();
    assert_eq!(entries.len(), 1, "temporary files left behind");
}

#[test]
fn test_label_count_mismatch_is_fatal() {
    let (raw, labels) = separable_dataset();
    let short = labels.subset(&[0, 1, 2]).unwrap();
    let err = clean(&raw, &short).unwrap_err();
    assert!(matches!(err, BiomarkerError::DimensionMismatch { .. }));
}

#[test]
fn test_pipeline_run_writes_reports() {
    let dir = TempDir::new().unwrap();
    let data = generate_synthetic(&SyntheticConfig::two_class()).unwrap();
    let (data_path, labels_path) = data.write_to_dir(dir.path().join("raw")).unwrap();

    let symbols = dir.path().join("symbols.tsv");
    std::fs::write(&symbols, "gene_id\tsymbol\ngene_0\tESR1\n").unwrap();

    let mut config = PipelineConfig::default();
    config.paths.data = data_path.clone();
    config.paths.labels = labels_path;
    config.paths.output_dir = dir.path().join("results");
    config.paths.symbol_table = Some(symbols);
    config.selection.k = 20;
    config.interpretation.panel_size = 8;

    let pipeline = Pipeline::new(config);
    let summary = pipeline.run().unwrap();
    assert_eq!(summary.n_samples, 60);
    assert_eq!(summary.n_selected, 20);
    assert_eq!(summary.panel_size, 8);
    assert_eq!(summary.best_macro_f1, 1.0);

    let layout = pipeline.layout();
    for path in [
        layout.cleaned(),
        layout.scaling(),
        layout.reduced(),
        layout.model(),
        layout.best_model(),
        layout.training_summary(),
        layout.comparison(),
        layout.panel(),
        layout.rankings(),
        layout.class_top(),
        layout.dashboard(),
        layout.symbols(),
    ] {
        assert!(path.exists(), "missing {}", path.display());
    }

    let panel = std::fs::read_to_string(layout.panel()).unwrap();
    assert!(panel.starts_with("gene_id\tsymbol\tdominant_class\tcoefficient\trank"));
    assert_eq!(panel.lines().count(), 9);
    assert!(panel.contains("unresolved"));

    let comparison = std::fs::read_to_string(layout.comparison()).unwrap();
    assert_eq!(comparison.lines().count(), 4);

    // The top of the panel comes from the planted genes.
    let informative: HashSet<&String> = data.informative_features.values().flatten().collect();
    let interpretation = pipeline
        .run_interpret(None, Some(dir.path().join("again").as_path()))
        .unwrap();
    for entry in interpretation.panel.entries.iter().take(5) {
        assert!(informative.contains(&entry.gene_id), "{} not informative", entry.gene_id);
        if entry.gene_id == "gene_0" {
            assert_eq!(entry.symbol, Resolution::Resolved("ESR1".to_string()));
        }
    }

    // Batch prediction with the persisted scaling and best model.
    let predictions = pipeline.predict(&data_path, None, None, None).unwrap();
    assert_eq!(predictions.len(), 60);
    let correct = predictions
        .iter()
        .zip(data.labels.labels())
        .filter(|(p, label)| p.predicted == **label)
        .count();
    assert_eq!(correct, 60);
    assert!(layout.predictions().exists());
}
