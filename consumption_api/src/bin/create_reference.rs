//! Build the drift and performance reference datasets
//!
//! The drift reference is windowed from the training split, the performance
//! reference from the test split plus the Production model's predictions.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use consumption_forecast::data::{
    add_predictions_to_reference, create_reference_data, save_versioned, version_stamp,
    DataLoader,
};
use consumption_forecast::registry::{FsModelRegistry, ModelRegistry, Stage};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "create_reference")]
#[command(about = "Create versioned reference datasets for monitoring")]
struct Cli {
    /// CSV of the training split
    #[arg(long)]
    train: PathBuf,
    /// CSV of the test split
    #[arg(long)]
    test: PathBuf,
    /// Column holding the consumption values
    #[arg(long, default_value = "Consommation")]
    target_col: String,
    /// Values per Feature Window
    #[arg(short, long, default_value_t = 48)]
    window_size: usize,
    /// Windows to sample from each split; all of them when omitted
    #[arg(short, long)]
    fraction: Option<usize>,
    /// Seed making the sample reproducible
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long, default_value = "model_registry")]
    registry_dir: PathBuf,
    #[arg(long, default_value = "timeseries_xgboost_30min")]
    model_name: String,
    /// Directory receiving both versioned datasets
    #[arg(short, long, default_value = "data/reference")]
    output_dir: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let train = DataLoader::from_csv(&cli.train)
        .with_context(|| format!("loading {}", cli.train.display()))?;
    let test = DataLoader::from_csv(&cli.test)
        .with_context(|| format!("loading {}", cli.test.display()))?;

    let mut ref_drift =
        create_reference_data(&train, &cli.target_col, cli.window_size, cli.fraction, cli.seed)?;
    let mut ref_perf =
        create_reference_data(&test, &cli.target_col, cli.window_size, cli.fraction, cli.seed)?;

    let registry = FsModelRegistry::open(&cli.registry_dir)?;
    let model = registry
        .load(&cli.model_name, Stage::Production)
        .with_context(|| format!("loading Production model '{}'", cli.model_name))?;
    add_predictions_to_reference(&mut ref_perf, model.as_ref(), cli.window_size)?;

    let stamp = version_stamp(Utc::now());
    let drift_path = save_versioned(
        &mut ref_drift,
        cli.output_dir.join("reference_data_drift.csv"),
        &stamp,
    )?;
    let perf_path = save_versioned(
        &mut ref_perf,
        cli.output_dir.join("reference_data_perf.csv"),
        &stamp,
    )?;

    info!(
        drift = %drift_path.display(),
        perf = %perf_path.display(),
        "reference datasets created"
    );
    Ok(())
}
