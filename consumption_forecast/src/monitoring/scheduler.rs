//! Periodic execution of monitoring cycles

use crate::error::{ForecastError, Result};
use crate::monitoring::{MonitoringOutcome, MonitoringPipeline, TrackingSink};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Run one cycle on the blocking pool, then publish it to `sink`
///
/// The cycle's own errors are returned; a failing sink is only logged.
pub async fn run_once(
    pipeline: Arc<MonitoringPipeline>,
    sink: &dyn TrackingSink,
) -> Result<MonitoringOutcome> {
    let outcome = tokio::task::spawn_blocking(move || pipeline.run_cycle())
        .await
        .map_err(|e| ForecastError::StorageError(format!("monitoring cycle aborted: {}", e)))??;

    if let Err(e) = sink.publish(&outcome).await {
        warn!(error = %e, "could not publish monitoring run to tracking sink");
    }
    Ok(outcome)
}

/// Background task running a monitoring cycle every interval
#[derive(Debug)]
pub struct MonitoringScheduler {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl MonitoringScheduler {
    /// Start the task; the first cycle runs one `interval` from now
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        pipeline: Arc<MonitoringPipeline>,
        interval: Duration,
        sink: Arc<dyn TrackingSink>,
    ) -> Self {
        let token = CancellationToken::new();
        let cancelled = token.child_token();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => {
                        match run_once(Arc::clone(&pipeline), sink.as_ref()).await {
                            Ok(outcome) => info!(
                                timestamp = %outcome.snapshot.timestamp,
                                drift_score = outcome.drift.score,
                                "monitoring cycle complete"
                            ),
                            Err(e) => error!(error = %e, "monitoring cycle failed, skipping"),
                        }
                    }
                }
            }
        });

        info!(interval_secs = interval.as_secs(), "monitoring scheduler started");
        Self { token, task }
    }

    /// Cancel the task and wait for the running cycle, if any, to end
    pub async fn stop(self) {
        self.token.cancel();
        if let Err(e) = self.task.await {
            error!(error = %e, "monitoring scheduler ended abnormally");
        }
        info!("monitoring scheduler stopped");
    }
}
