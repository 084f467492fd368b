//! Print the most recent monitoring snapshots

use anyhow::Result;
use clap::Parser;
use consumption_forecast::MetricsStore;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "metrics_viewer")]
#[command(about = "Show the latest drift and performance metrics")]
struct Cli {
    /// Metrics database written by the monitoring scheduler
    #[arg(short, long, default_value = "reports/db/metrics.db")]
    db: PathBuf,
    /// Number of snapshots to show, newest first
    #[arg(short, long, default_value_t = 20)]
    limit: usize,
    /// Print JSON lines instead of a table
    #[arg(long)]
    json: bool,
}

fn fmt_metric(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.4}", v))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let store = MetricsStore::open(&cli.db)?;
    let snapshots = store.latest(cli.limit)?;
    if snapshots.is_empty() {
        println!("No metrics found in {}", cli.db.display());
        return Ok(());
    }

    if cli.json {
        for snapshot in &snapshots {
            println!("{}", serde_json::to_string(snapshot)?);
        }
        return Ok(());
    }

    println!(
        "{:<20} {:<28} {:>8} {:>12} {:>12} {:>8} {:>8}  Reports",
        "Timestamp", "Model", "Version", "MAE", "RMSE", "R2", "Drift"
    );
    for s in &snapshots {
        println!(
            "{:<20} {:<28} {:>8} {:>12} {:>12} {:>8} {:>8.4}  {}{}",
            s.timestamp,
            s.model_name,
            s.model_version,
            fmt_metric(s.mae),
            fmt_metric(s.rmse),
            fmt_metric(s.r2),
            s.drift_score,
            s.drift_report_path,
            s.perf_report_path
                .as_deref()
                .map(|p| format!(", {}", p))
                .unwrap_or_default(),
        );
    }

    Ok(())
}
