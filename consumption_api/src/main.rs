use consumption_api::{create_router, AppState, Config};
use consumption_forecast::monitoring::{
    MlflowTracking, MonitoringPipeline, MonitoringScheduler, NoopTracking, TrackingSink,
};
use consumption_forecast::registry::FsModelRegistry;
use consumption_forecast::{EventLogs, MetricsStore, ModelManager};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Consumption Forecasting API");

    let config = Config::from_env()?;

    info!(registry = %config.model.registry_dir.display(), "Opening model registry");
    let registry = Arc::new(FsModelRegistry::open(&config.model.registry_dir)?);
    let manager = Arc::new(ModelManager::from_config(&config.manager_config(), registry)?);

    let initial = {
        let manager = Arc::clone(&manager);
        tokio::task::spawn_blocking(move || manager.load_model()).await?
    };
    info!(outcome = ?initial, "Initial model load");
    manager.start_watcher();

    let logs = Arc::new(EventLogs::open(&config.monitoring.log_dir)?);

    info!(path = %config.monitoring.metrics_db.display(), "Opening metrics store");
    let store = Arc::new(MetricsStore::open(&config.monitoring.metrics_db)?);
    let monitoring = config.monitoring_config();
    if monitoring.interval_secs == 0 {
        anyhow::bail!("MONITORING_INTERVAL_SECS must be at least 1");
    }
    let interval = Duration::from_secs(monitoring.interval_secs);
    let pipeline = Arc::new(MonitoringPipeline::new(monitoring, store));

    let sink: Arc<dyn TrackingSink> = match &config.tracking.uri {
        Some(uri) => {
            info!(uri = %uri, experiment = %config.tracking.experiment, "Publishing monitoring runs to MLflow");
            Arc::new(MlflowTracking::new(uri, &config.tracking.experiment))
        }
        None => {
            warn!("MLFLOW_TRACKING_URI not set, monitoring runs are not published");
            Arc::new(NoopTracking)
        }
    };
    let scheduler = MonitoringScheduler::start(pipeline, interval, sink);

    let state = Arc::new(AppState::new(
        Arc::clone(&manager),
        logs,
        config.server.max_predictions,
    ));
    let app = create_router(state);

    let addr = config.server_address();
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down background tasks");
    scheduler.stop().await;
    manager.stop_watcher().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for Ctrl-C, shutting down");
    }
}
