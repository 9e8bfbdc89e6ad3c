//! Palmer CLI
//!
//! One subcommand per pipeline stage, plus `run` for all four in order.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossterm::{
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
};
use std::io::{stdout, Write};
use std::path::PathBuf;
use tracing::info;

use palmer::datasets::make_penguins;
use palmer::io::{read_table, write_table};
use palmer::pipeline::fisheries::{clean_fisheries, count_by, describe, fit_fisheries_model};
use palmer::pipeline::{
    run_all, run_evaluate, run_featurize, run_split, run_train, DirectorySink, Metrics, PathParams,
    PipelineConfig,
};

#[derive(Parser)]
#[command(name = "palmer")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Penguin sex classification pipeline", long_about = None)]
struct Cli {
    /// JSON params file; missing means defaults
    #[arg(long, global = true, default_value = "params.json")]
    params: PathBuf,

    /// Resolve data, artifact and report directories under this root
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Random seed for splitting and permutation importance
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Fraction of rows in the training partition
    #[arg(long, global = true)]
    train_fraction: Option<f64>,

    /// Number of neighbors for KNN
    #[arg(long, global = true)]
    neighbors: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean the raw dataset and write train/test partitions
    Split,
    /// Fit encoders on train and featurize both partitions
    Featurize,
    /// Fit KNN and report train/test accuracy
    Train,
    /// Evaluate the saved model on the featurized test set
    Evaluate,
    /// Run split, featurize, train and evaluate
    Run,
    /// Write a synthetic penguins table as the raw dataset
    Sample {
        #[arg(long, default_value = "344")]
        rows: usize,

        /// Rows with every measurement missing
        #[arg(long, default_value = "2")]
        missing: usize,
    },
    /// Clean an aquaculture production CSV and fit a random forest
    Fisheries {
        /// Raw fish_aq2a CSV
        #[arg(short, long)]
        data: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "palmer=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Split => {
            let s = run_split(&config.split, &config.paths).context("split stage failed")?;
            line("train rows", &s.train_rows.to_string(), Color::Cyan)?;
            line("test rows", &s.test_rows.to_string(), Color::Cyan)?;
        }
        Commands::Featurize => {
            let s = run_featurize(&config.featurize, &config.evaluate, &config.paths)
                .context("featurize stage failed")?;
            line("train rows", &s.train_rows.to_string(), Color::Cyan)?;
            line("test rows", &s.test_rows.to_string(), Color::Cyan)?;
            line("columns", &s.columns.join(", "), Color::DarkGrey)?;
        }
        Commands::Train => {
            let r = run_train(&config).context("train stage failed")?;
            line("Train accuracy", &format!("{:.4}", r.train_accuracy), Color::Green)?;
            line("Test accuracy", &format!("{:.4}", r.test_accuracy), Color::Green)?;
        }
        Commands::Evaluate => {
            let mut sink = DirectorySink::new(&config.paths.report_dir);
            let metrics = run_evaluate(&config, &mut sink).context("evaluate stage failed")?;
            print_metrics(&metrics)?;
        }
        Commands::Run => {
            let mut sink = DirectorySink::new(&config.paths.report_dir);
            let summary = run_all(&config, &mut sink).context("pipeline run failed")?;
            line("Train accuracy", &format!("{:.4}", summary.train.train_accuracy), Color::Green)?;
            line("Test accuracy", &format!("{:.4}", summary.train.test_accuracy), Color::Green)?;
            print_metrics(&summary.metrics)?;
        }
        Commands::Sample { rows, missing } => {
            let table = make_penguins(rows, missing, config.split.random_seed)?;
            let path = config.paths.raw_path();
            write_table(&path, &table).with_context(|| format!("writing {}", path.display()))?;
            line("wrote", &path.display().to_string(), Color::Cyan)?;
        }
        Commands::Fisheries { data } => {
            let raw = read_table(&data).with_context(|| format!("reading {}", data.display()))?;
            let clean = clean_fisheries(&raw)?;
            for (code, n) in count_by(&clean, "aquameth")? {
                let name = describe("aquameth", &code).unwrap_or(code.as_str());
                line(name, &n.to_string(), Color::DarkGrey)?;
            }
            let report = fit_fisheries_model(&clean, &config.fisheries)?;
            line("R²", &format!("{:.4}", report.r2), Color::Green)?;
            line("RMSE", &format!("{:.2}", report.rmse), Color::Yellow)?;
            line("MAE", &format!("{:.2}", report.mae), Color::Yellow)?;
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut config = PipelineConfig::from_file(&cli.params)
        .with_context(|| format!("loading {}", cli.params.display()))?;
    if let Some(root) = &cli.root {
        config.paths = PathParams {
            raw_dataset: config.paths.raw_dataset.clone(),
            ..PathParams::rooted_at(root)
        };
    }
    if let Some(seed) = cli.seed {
        config.split.random_seed = seed;
        config.fisheries.random_seed = seed;
    }
    if let Some(fraction) = cli.train_fraction {
        config.split.train_fraction = fraction;
        config.fisheries.train_fraction = fraction;
    }
    if let Some(k) = cli.neighbors {
        config.train.neighbor_count = k;
    }
    config.validate()?;
    info!(params = %cli.params.display(), "loaded configuration");
    Ok(config)
}

fn print_metrics(metrics: &Metrics) -> Result<()> {
    line("Accuracy", &format!("{:.4}", metrics.accuracy), Color::Green)?;
    if let Some(roc) = &metrics.roc {
        line("ROC AUC", &format!("{:.4}", roc.auc), Color::Green)?;
    }
    for fi in &metrics.feature_importance {
        line(
            &fi.feature,
            &format!("{:+.4} ± {:.4}", fi.importance_mean, fi.importance_std),
            Color::DarkGrey,
        )?;
    }
    Ok(())
}

fn line(label: &str, value: &str, color: Color) -> Result<()> {
    let mut out = stdout();
    execute!(
        out,
        Print(format!("{:>18}: ", label)),
        SetForegroundColor(color),
        Print(value),
        ResetColor,
        Print("\n"),
    )?;
    out.flush()?;
    Ok(())
}
