//! biomarker - RNA-Seq cancer biomarker pipeline CLI
//!
//! Command-line interface for the clean → select → train → interpret stages.

use clap::{Parser, Subcommand, ValueEnum};
use rnaseq_biomarker::benchmark::{generate_synthetic, SyntheticConfig};
use rnaseq_biomarker::error::Result;
use rnaseq_biomarker::pipeline::{Pipeline, PipelineConfig};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Synthetic dataset presets
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Preset {
    /// Five classes with TCGA pan-cancer proportions (801 samples)
    PanCancer,
    /// Two well-separated classes
    TwoClass,
    /// Weak signal, few samples
    LowSignal,
    /// Five balanced classes, 200 genes
    Default,
}

impl From<Preset> for SyntheticConfig {
    fn from(preset: Preset) -> Self {
        match preset {
            Preset::PanCancer => SyntheticConfig::pan_cancer(),
            Preset::TwoClass => SyntheticConfig::two_class(),
            Preset::LowSignal => SyntheticConfig::low_signal(),
            Preset::Default => SyntheticConfig::default(),
        }
    }
}

/// RNA-Seq cancer biomarker discovery pipeline
#[derive(Parser)]
#[command(name = "biomarker")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Pipeline configuration YAML (defaults are used when absent)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate and standardize the raw expression data
    Clean {
        /// Expression matrix CSV/TSV (samples × genes)
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Label table CSV/TSV
        #[arg(short, long)]
        labels: Option<PathBuf>,

        /// Output path for the cleaned artifact
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Select the top-K features by ANOVA F score
    Select {
        /// Cleaned artifact
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output path for the reduced artifact
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Train and compare classifiers
    Train {
        /// Reduced artifact
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Directory for models and training reports
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Rank coefficients and build the biomarker panel
    Interpret {
        /// Logistic regression model artifact
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Directory for panel and reports
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Gene id → symbol TSV (built-in table when absent)
        #[arg(short, long)]
        symbols: Option<PathBuf>,
    },

    /// Run all four stages
    Run {
        /// Expression matrix CSV/TSV
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Label table CSV/TSV
        #[arg(short, long)]
        labels: Option<PathBuf>,

        /// Directory for all artifacts and reports
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Profile raw data quality without writing artifacts
    Profile {
        /// Expression matrix CSV/TSV
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Label table CSV/TSV
        #[arg(short, long)]
        labels: Option<PathBuf>,

        /// Output format: text, json, or yaml
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Classify new raw samples with persisted scaling and model
    Predict {
        /// Expression matrix CSV/TSV to classify
        #[arg(short, long)]
        data: PathBuf,

        /// Scaling parameters artifact
        #[arg(short, long)]
        scaling: Option<PathBuf>,

        /// Model artifact (best model when absent)
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Output path for predictions TSV
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate a synthetic labelled dataset
    Simulate {
        /// Output directory
        #[arg(short, long)]
        output_dir: PathBuf,

        /// Dataset preset
        #[arg(short, long, value_enum, default_value = "default")]
        preset: Preset,

        /// Samples per class (overrides the preset's class sizes)
        #[arg(long)]
        samples_per_class: Option<usize>,

        /// Number of genes
        #[arg(long)]
        n_features: Option<usize>,

        /// Random seed
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Write a default pipeline configuration
    ExampleConfig {
        /// Output path for the YAML file
        #[arg(short, long, default_value = "pipeline.yaml")]
        output: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let result = match cli.command {
        Commands::Clean {
            data,
            labels,
            output,
        } => cmd_clean(
            cli.config.as_deref(),
            data.as_deref(),
            labels.as_deref(),
            output.as_deref(),
        ),

        Commands::Select { input, output } => {
            cmd_select(cli.config.as_deref(), input.as_deref(), output.as_deref())
        }

        Commands::Train { input, output_dir } => {
            cmd_train(cli.config.as_deref(), input.as_deref(), output_dir.as_deref())
        }

        Commands::Interpret {
            model,
            output_dir,
            symbols,
        } => cmd_interpret(
            cli.config.as_deref(),
            model.as_deref(),
            output_dir.as_deref(),
            symbols,
        ),

        Commands::Run {
            data,
            labels,
            output_dir,
        } => cmd_run(cli.config.as_deref(), data, labels, output_dir),

        Commands::Profile {
            data,
            labels,
            format,
        } => cmd_profile(
            cli.config.as_deref(),
            data.as_deref(),
            labels.as_deref(),
            &format,
        ),

        Commands::Predict {
            data,
            scaling,
            model,
            output,
        } => cmd_predict(
            cli.config.as_deref(),
            &data,
            scaling.as_deref(),
            model.as_deref(),
            output.as_deref(),
        ),

        Commands::Simulate {
            output_dir,
            preset,
            samples_per_class,
            n_features,
            seed,
        } => cmd_simulate(&output_dir, preset, samples_per_class, n_features, seed),

        Commands::ExampleConfig { output } => cmd_example_config(&output),
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn setup_logging(verbose: bool) {
    let filter = if verbose { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            PipelineConfig::from_file(path)
        }
        None => Ok(PipelineConfig::default()),
    }
}

/// Stage 1: ingestion and cleaning
fn cmd_clean(
    config: Option<&Path>,
    data: Option<&Path>,
    labels: Option<&Path>,
    output: Option<&Path>,
) -> Result<()> {
    let pipeline = Pipeline::new(load_config(config)?);
    let cleaned = pipeline.run_clean(data, labels, output)?;
    println!("{}", cleaned.summary);
    Ok(())
}

/// Stage 2: feature selection
fn cmd_select(config: Option<&Path>, input: Option<&Path>, output: Option<&Path>) -> Result<()> {
    let pipeline = Pipeline::new(load_config(config)?);
    let reduced = pipeline.run_select(input, output)?;

    println!(
        "Selected {} of {} features ({:?})",
        reduced.subset.len(),
        reduced.selection.n_input_features,
        reduced.selection.scope
    );
    println!("\nTop 10 features:");
    for (id, score) in reduced
        .subset
        .feature_ids
        .iter()
        .zip(&reduced.subset.scores)
        .take(10)
    {
        println!("  {}: F = {:.2}", id, score);
    }
    Ok(())
}

/// Stage 3: training and evaluation
fn cmd_train(config: Option<&Path>, input: Option<&Path>, output_dir: Option<&Path>) -> Result<()> {
    let pipeline = Pipeline::new(load_config(config)?);
    let outcome = pipeline.run_train(input, output_dir)?;
    println!("{}", outcome.summary.comparison);
    if let Some(best) = outcome.summary.comparison.best() {
        println!("{}", best.report);
    }
    Ok(())
}

/// Stage 4: biomarker interpretation
fn cmd_interpret(
    config: Option<&Path>,
    model: Option<&Path>,
    output_dir: Option<&Path>,
    symbols: Option<PathBuf>,
) -> Result<()> {
    let mut config = load_config(config)?;
    if symbols.is_some() {
        config.paths.symbol_table = symbols;
    }
    let pipeline = Pipeline::new(config);
    let outcome = pipeline.run_interpret(model, output_dir)?;
    println!("{}", outcome.panel);
    Ok(())
}

/// Run all stages
fn cmd_run(
    config: Option<&Path>,
    data: Option<PathBuf>,
    labels: Option<PathBuf>,
    output_dir: Option<PathBuf>,
) -> Result<()> {
    let mut config = load_config(config)?;
    if let Some(data) = data {
        config.paths.data = data;
    }
    if let Some(labels) = labels {
        config.paths.labels = labels;
    }
    if let Some(dir) = output_dir {
        config.paths.output_dir = dir;
    }

    info!("Running pipeline '{}'", config.name);
    let summary = Pipeline::new(config).run()?;
    println!("{}", summary);
    Ok(())
}

/// Profile raw inputs
fn cmd_profile(
    config: Option<&Path>,
    data: Option<&Path>,
    labels: Option<&Path>,
    format: &str,
) -> Result<()> {
    let pipeline = Pipeline::new(load_config(config)?);
    let (integrity, summary) = pipeline.profile(data, labels)?;

    match format {
        "json" => {
            let profile = serde_json::json!({
                "summary": summary,
                "integrity": integrity,
            });
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
        "yaml" => {
            let mut profile = BTreeMap::new();
            profile.insert("summary", serde_yaml::to_value(&summary)?);
            profile.insert("integrity", serde_yaml::to_value(&integrity)?);
            println!("{}", serde_yaml::to_string(&profile)?);
        }
        _ => {
            println!("{}", summary);
            println!("{}", integrity);
            if integrity.is_clean() {
                println!("Data passes all integrity checks.");
            }
        }
    }
    Ok(())
}

/// Batch prediction on new samples
fn cmd_predict(
    config: Option<&Path>,
    data: &Path,
    scaling: Option<&Path>,
    model: Option<&Path>,
    output: Option<&Path>,
) -> Result<()> {
    let pipeline = Pipeline::new(load_config(config)?);
    let predictions = pipeline.predict(data, scaling, model, output)?;

    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for p in &predictions {
        *counts.entry(p.predicted.to_string()).or_insert(0) += 1;
    }
    println!("Classified {} samples", predictions.len());
    for (class, n) in counts {
        println!("  {}: {}", class, n);
    }
    Ok(())
}

/// Generate a synthetic dataset
fn cmd_simulate(
    output_dir: &Path,
    preset: Preset,
    samples_per_class: Option<usize>,
    n_features: Option<usize>,
    seed: Option<u64>,
) -> Result<()> {
    let mut config = SyntheticConfig::from(preset);
    if let Some(n) = samples_per_class {
        let classes: Vec<_> = config.class_sizes.keys().copied().collect();
        config = config.with_classes(&classes, n);
    }
    if let Some(n) = n_features {
        config.n_features = n;
    }
    if let Some(seed) = seed {
        config = config.with_seed(seed);
    }

    info!(
        "Generating '{}': {} samples x {} genes",
        config.name,
        config.n_samples(),
        config.n_features + config.n_silent
    );
    let data = generate_synthetic(&config)?;
    let (data_path, labels_path) = data.write_to_dir(output_dir)?;
    println!("Expression data: {}", data_path.display());
    println!("Labels: {}", labels_path.display());
    for (class, genes) in &data.informative_features {
        println!("  {}: {} informative genes", class, genes.len());
    }
    Ok(())
}

/// Write a default configuration file
fn cmd_example_config(output_path: &Path) -> Result<()> {
    let yaml = PipelineConfig::default().to_yaml()?;
    std::fs::write(output_path, &yaml)?;
    info!("Wrote example configuration to {}", output_path.display());
    println!("{}", yaml);
    Ok(())
}
