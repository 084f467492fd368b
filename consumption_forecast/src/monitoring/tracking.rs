//! Forwarding of monitoring results to an experiment tracker
//!
//! Publishing is best-effort: the scheduler logs failures and moves on, the
//! snapshot is already stored by the time a sink sees it.

use crate::error::{ForecastError, Result};
use crate::monitoring::MonitoringOutcome;
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Destination for monitoring outcomes
#[async_trait]
pub trait TrackingSink: Send + Sync {
    /// Record one monitoring cycle
    async fn publish(&self, outcome: &MonitoringOutcome) -> Result<()>;
}

/// Sink that drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTracking;

#[async_trait]
impl TrackingSink for NoopTracking {
    async fn publish(&self, _outcome: &MonitoringOutcome) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ExperimentEnvelope {
    experiment: ExperimentInfo,
}

#[derive(Debug, Deserialize)]
struct ExperimentInfo {
    experiment_id: String,
}

#[derive(Debug, Deserialize)]
struct CreatedExperiment {
    experiment_id: String,
}

#[derive(Debug, Deserialize)]
struct RunEnvelope {
    run: RunBody,
}

#[derive(Debug, Deserialize)]
struct RunBody {
    info: RunInfo,
}

#[derive(Debug, Deserialize)]
struct RunInfo {
    run_id: String,
}

/// MLflow tracking server reached over its REST API
#[derive(Debug)]
pub struct MlflowTracking {
    client: reqwest::Client,
    base_url: String,
    experiment_name: String,
    experiment_id: OnceCell<String>,
}

impl MlflowTracking {
    /// Sink logging into `experiment_name` on the server at `tracking_uri`
    pub fn new(tracking_uri: &str, experiment_name: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: tracking_uri.trim_end_matches('/').to_string(),
            experiment_name: experiment_name.to_string(),
            experiment_id: OnceCell::new(),
        }
    }

    fn api(&self, endpoint: &str) -> String {
        format!("{}/api/2.0/mlflow/{}", self.base_url, endpoint)
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        body: serde_json::Value,
    ) -> Result<T> {
        let response = self
            .client
            .post(self.api(endpoint))
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    async fn experiment_id(&self) -> Result<&String> {
        self.experiment_id
            .get_or_try_init(|| async {
                let response = self
                    .client
                    .get(self.api("experiments/get-by-name"))
                    .query(&[("experiment_name", self.experiment_name.as_str())])
                    .send()
                    .await?;

                if response.status() == reqwest::StatusCode::NOT_FOUND {
                    let created: CreatedExperiment = self
                        .post("experiments/create", json!({ "name": self.experiment_name }))
                        .await?;
                    info!(experiment = %self.experiment_name, "created tracking experiment");
                    return Ok(created.experiment_id);
                }

                let found: ExperimentEnvelope = response.error_for_status()?.json().await?;
                Ok::<_, ForecastError>(found.experiment.experiment_id)
            })
            .await
    }

    async fn upload_artifact(&self, experiment_id: &str, run_id: &str, file: &Path) -> Result<()> {
        let name = file
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                ForecastError::TrackingError(format!("Bad artifact path {}", file.display()))
            })?;
        let body = tokio::fs::read(file).await?;
        let url = format!(
            "{}/api/2.0/mlflow-artifacts/artifacts/{}/{}/artifacts/monitoring_reports/{}",
            self.base_url, experiment_id, run_id, name
        );
        self.client
            .put(url)
            .body(body)
            .send()
            .await?
            .error_for_status()?;
        debug!(artifact = name, run_id, "uploaded report artifact");
        Ok(())
    }
}

#[async_trait]
impl TrackingSink for MlflowTracking {
    async fn publish(&self, outcome: &MonitoringOutcome) -> Result<()> {
        let snapshot = &outcome.snapshot;
        let experiment_id = self.experiment_id().await?.clone();
        let now = Utc::now().timestamp_millis();

        let tags = json!([
            { "key": "model_name", "value": snapshot.model_name },
            { "key": "model_version", "value": snapshot.model_version },
            { "key": "timestamp", "value": snapshot.timestamp },
        ]);
        let created: RunEnvelope = self
            .post(
                "runs/create",
                json!({
                    "experiment_id": experiment_id,
                    "run_name": format!("monitoring_{}", snapshot.timestamp),
                    "start_time": now,
                    "tags": tags,
                }),
            )
            .await?;
        let run_id = created.run.info.run_id;

        let metrics: Vec<serde_json::Value> = [
            ("drift_score", Some(snapshot.drift_score)),
            ("rmse", snapshot.rmse),
            ("mae", snapshot.mae),
            ("r2", snapshot.r2),
        ]
        .into_iter()
        .map(|(key, value)| {
            json!({ "key": key, "value": value.unwrap_or(0.0), "timestamp": now, "step": 0 })
        })
        .collect();
        let _: serde_json::Value = self
            .post("runs/log-batch", json!({ "run_id": run_id, "metrics": metrics }))
            .await?;

        for artifact in outcome.report_paths() {
            self.upload_artifact(&experiment_id, &run_id, artifact)
                .await?;
        }

        let _: serde_json::Value = self
            .post(
                "runs/update",
                json!({
                    "run_id": run_id,
                    "status": "FINISHED",
                    "end_time": Utc::now().timestamp_millis(),
                }),
            )
            .await?;

        info!(run_id = %run_id, "published monitoring run");
        Ok(())
    }
}
