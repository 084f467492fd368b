//! Ownership of the served model
//!
//! The manager holds the single active model together with its registry
//! version behind one mutex. Predictions and swaps both take that lock for
//! their whole duration, so a request sees either the old model or the new
//! one, never a model paired with the wrong version tag. A background
//! watcher polls the registry and swaps in newer Production versions.

use crate::autoregressive::AutoregressivePredictor;
use crate::error::{ForecastError, Result};
use crate::models::{FeatureMatrix, ModelHandle};
use crate::registry::{latest_production, ModelRegistry};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Settings of the Model Manager
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Registered model name to serve
    pub model_name: String,
    /// Seconds between registry checks
    pub check_interval_secs: u64,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            model_name: "timeseries_xgboost_30min".to_string(),
            check_interval_secs: 300,
        }
    }
}

/// What a call to [`ModelManager::load_model`] did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The registry has no Production version; nothing changed
    NoProductionVersion,
    /// The latest Production version is already being served
    Unchanged { version: String },
    /// A new version was loaded and swapped in
    Swapped {
        previous: Option<String>,
        current: String,
    },
    /// The check or the load failed; the previous model is still active
    Failed(String),
}

/// Forecast together with the model that produced it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServedForecast {
    pub model_name: String,
    pub model_version: String,
    /// One row per input window, one column per step
    pub predictions: Vec<Vec<f64>>,
}

struct ActiveModel {
    model: Box<dyn ModelHandle>,
    version: String,
}

struct Watcher {
    token: CancellationToken,
    task: JoinHandle<()>,
}

/// Keeps the served model current with the registry
pub struct ModelManager {
    model_name: String,
    check_interval: Duration,
    registry: Arc<dyn ModelRegistry>,
    active: Mutex<Option<ActiveModel>>,
    watcher: Mutex<Option<Watcher>>,
}

impl fmt::Debug for ModelManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelManager")
            .field("model_name", &self.model_name)
            .field("check_interval", &self.check_interval)
            .field("current_version", &self.current_version())
            .field("watching", &self.is_watching())
            .finish()
    }
}

impl ModelManager {
    /// Create a manager with no model loaded yet
    pub fn new(
        model_name: impl Into<String>,
        registry: Arc<dyn ModelRegistry>,
        check_interval: Duration,
    ) -> Self {
        Self {
            model_name: model_name.into(),
            check_interval,
            registry,
            active: Mutex::new(None),
            watcher: Mutex::new(None),
        }
    }

    /// Create a manager from its configuration
    pub fn from_config(config: &ManagerConfig, registry: Arc<dyn ModelRegistry>) -> Result<Self> {
        if config.check_interval_secs == 0 {
            return Err(ForecastError::InvalidParameter(
                "Model check interval must be at least one second".to_string(),
            ));
        }
        Ok(Self::new(
            config.model_name.clone(),
            registry,
            Duration::from_secs(config.check_interval_secs),
        ))
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn check_interval(&self) -> Duration {
        self.check_interval
    }

    /// Version currently served, `None` before the first successful load
    pub fn current_version(&self) -> Option<String> {
        self.active.lock().as_ref().map(|a| a.version.clone())
    }

    /// Whether a model has been loaded
    pub fn is_ready(&self) -> bool {
        self.active.lock().is_some()
    }

    /// Adopt the latest Production version if it differs from the served one
    ///
    /// Never fails: errors are logged and reported as [`LoadOutcome::Failed`],
    /// leaving the previous model in place.
    #[instrument(skip(self), fields(model = %self.model_name))]
    pub fn load_model(&self) -> LoadOutcome {
        match self.try_load_model() {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "error while loading model");
                LoadOutcome::Failed(e.to_string())
            }
        }
    }

    fn try_load_model(&self) -> Result<LoadOutcome> {
        let versions = self.registry.search_versions(&self.model_name)?;
        let latest = match latest_production(&versions) {
            Some(v) => v.version.clone(),
            None => {
                info!("no model found in Production");
                return Ok(LoadOutcome::NoProductionVersion);
            }
        };

        if self.current_version().as_deref() == Some(latest.as_str()) {
            debug!(version = %latest, "served model is up to date");
            return Ok(LoadOutcome::Unchanged { version: latest });
        }

        info!(version = %latest, "new model detected");
        let mut active = self.active.lock();

        // Another caller may have swapped while we waited for the lock
        if active.as_ref().map(|a| a.version.as_str()) == Some(latest.as_str()) {
            return Ok(LoadOutcome::Unchanged { version: latest });
        }

        let model = self.registry.load_version(&self.model_name, &latest)?;
        let previous = active
            .replace(ActiveModel {
                model,
                version: latest.clone(),
            })
            .map(|old| old.version);

        info!(version = %latest, previous = ?previous, "model successfully loaded");
        Ok(LoadOutcome::Swapped {
            previous,
            current: latest,
        })
    }

    /// Forecast `steps` values for every window of `rows`
    ///
    /// Holds the model lock for the whole forecast, so predictions serialize
    /// with each other and with swaps.
    pub fn predict(&self, rows: &[Vec<f64>], steps: usize) -> Result<ServedForecast> {
        let active = self.active.lock();
        let active = active.as_ref().ok_or_else(|| {
            ForecastError::NotReady(format!("no version of '{}' loaded", self.model_name))
        })?;

        let features = FeatureMatrix::from_rows(rows)?;
        if let Some(width) = active.model.window_size() {
            if width != features.cols() {
                return Err(ForecastError::ValidationError(format!(
                    "Model v{} expects windows of {} values, got {}",
                    active.version,
                    width,
                    features.cols()
                )));
            }
        }

        let predictions =
            AutoregressivePredictor::new(active.model.as_ref()).predict(&features, steps)?;

        Ok(ServedForecast {
            model_name: self.model_name.clone(),
            model_version: active.version.clone(),
            predictions,
        })
    }

    /// Whether the background watcher is running
    pub fn is_watching(&self) -> bool {
        self.watcher.lock().is_some()
    }

    /// Start polling the registry every `check_interval`
    ///
    /// Must be called from within a tokio runtime. Returns `false` when a
    /// watcher is already running.
    pub fn start_watcher(self: &Arc<Self>) -> bool {
        let mut slot = self.watcher.lock();
        if slot.is_some() {
            warn!(model = %self.model_name, "watcher already running");
            return false;
        }

        let token = CancellationToken::new();
        let manager = Arc::clone(self);
        let task = tokio::spawn(manager.watch(token.child_token()));
        *slot = Some(Watcher { token, task });

        info!(
            model = %self.model_name,
            interval_secs = self.check_interval.as_secs(),
            "watcher started"
        );
        true
    }

    async fn watch(self: Arc<Self>, token: CancellationToken) {
        let mut ticker = tokio::time::interval(self.check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    let manager = Arc::clone(&self);
                    match tokio::task::spawn_blocking(move || manager.load_model()).await {
                        Ok(outcome) => debug!(?outcome, "registry check complete"),
                        Err(e) => error!(error = %e, "model registry check failed"),
                    }
                }
            }
        }
    }

    /// Stop the watcher and wait for it to finish
    pub async fn stop_watcher(&self) {
        let watcher = self.watcher.lock().take();
        if let Some(watcher) = watcher {
            watcher.token.cancel();
            if let Err(e) = watcher.task.await {
                error!(error = %e, "watcher task ended abnormally");
            }
            info!(model = %self.model_name, "watcher stopped");
        }
    }
}
