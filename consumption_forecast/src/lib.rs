//! # Consumption Forecast
//!
//! Serving-time core of an electrical consumption forecaster.
//!
//! ## Features
//!
//! - Autoregressive multi-step forecasting from any single-step regressor
//! - A Model Manager that hot-swaps the Production model from a registry
//! - Append-only prediction and ground-truth logs
//! - Windowed reference datasets for monitoring
//! - Drift and performance monitoring with HTML reports and a SQLite
//!   metrics store
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use consumption_forecast::models::ModelArtifact;
//! use consumption_forecast::registry::{FsModelRegistry, Stage};
//! use consumption_forecast::ModelManager;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # fn main() -> consumption_forecast::Result<()> {
//! let registry = FsModelRegistry::open("model_registry")?;
//! registry.register(
//!     "consumption",
//!     &ModelArtifact::MovingAverage { window: 4 },
//!     Stage::Production,
//! )?;
//!
//! let manager = ModelManager::new("consumption", Arc::new(registry), Duration::from_secs(300));
//! manager.load_model();
//!
//! let forecast = manager.predict(&[vec![1.0, 2.0, 3.0, 4.0]], 3)?;
//! assert_eq!(forecast.predictions[0].len(), 3);
//! # Ok(())
//! # }
//! ```

pub mod autoregressive;
pub mod data;
pub mod error;
pub mod logs;
pub mod manager;
pub mod models;
pub mod monitoring;
pub mod registry;
pub mod storage;

// Re-export commonly used types
pub use crate::autoregressive::AutoregressivePredictor;
pub use crate::data::{create_reference_data, DataLoader, ReferenceDataset};
pub use crate::error::{ForecastError, Result};
pub use crate::logs::{EventLogs, FeedbackRecord, PredictionRecord};
pub use crate::manager::{LoadOutcome, ManagerConfig, ModelManager, ServedForecast};
pub use crate::models::{FeatureMatrix, ModelHandle};
pub use crate::monitoring::{MonitoringConfig, MonitoringPipeline, MonitoringScheduler};
pub use crate::registry::{ModelRegistry, Stage};
pub use crate::storage::{MetricsSnapshot, MetricsStore};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
