use consumption_forecast::monitoring::MonitoringConfig;
use consumption_forecast::{ForecastError, ManagerConfig, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub monitoring: MonitoringSettings,
    pub tracking: TrackingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Largest `n_predictions` a single request may ask for
    pub max_predictions: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    pub registry_dir: PathBuf,
    pub check_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringSettings {
    pub log_dir: PathBuf,
    pub report_dir: PathBuf,
    pub metrics_db: PathBuf,
    pub reference_drift: PathBuf,
    pub reference_perf: PathBuf,
    pub interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// MLflow server; tracking is off when unset
    pub uri: Option<String>,
    pub experiment: String,
}

impl Config {
    /// Read the configuration from the environment, falling back to defaults
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let string = |key: &str, default: String| lookup(key).unwrap_or(default);
        let path = |key: &str, default: PathBuf| lookup(key).map(PathBuf::from).unwrap_or(default);

        Ok(Self {
            server: ServerConfig {
                host: string("SERVER_HOST", defaults.server.host),
                port: parse(&lookup, "SERVER_PORT", defaults.server.port)?,
                max_predictions: parse(&lookup, "MAX_PREDICTIONS", defaults.server.max_predictions)?,
            },
            model: ModelConfig {
                name: string("MODEL_NAME", defaults.model.name),
                registry_dir: path("MODEL_REGISTRY_DIR", defaults.model.registry_dir),
                check_interval_secs: parse(
                    &lookup,
                    "MODEL_CHECK_INTERVAL_SECS",
                    defaults.model.check_interval_secs,
                )?,
            },
            monitoring: MonitoringSettings {
                log_dir: path("LOG_DIR", defaults.monitoring.log_dir),
                report_dir: path("REPORT_DIR", defaults.monitoring.report_dir),
                metrics_db: path("METRICS_DB", defaults.monitoring.metrics_db),
                reference_drift: path("REFERENCE_DRIFT", defaults.monitoring.reference_drift),
                reference_perf: path("REFERENCE_PERF", defaults.monitoring.reference_perf),
                interval_secs: parse(
                    &lookup,
                    "MONITORING_INTERVAL_SECS",
                    defaults.monitoring.interval_secs,
                )?,
            },
            tracking: TrackingConfig {
                uri: lookup("MLFLOW_TRACKING_URI").filter(|uri| !uri.trim().is_empty()),
                experiment: string("MLFLOW_EXPERIMENT", defaults.tracking.experiment),
            },
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn manager_config(&self) -> ManagerConfig {
        ManagerConfig {
            model_name: self.model.name.clone(),
            check_interval_secs: self.model.check_interval_secs,
        }
    }

    pub fn monitoring_config(&self) -> MonitoringConfig {
        MonitoringConfig {
            log_dir: self.monitoring.log_dir.clone(),
            report_dir: self.monitoring.report_dir.clone(),
            reference_drift: self.monitoring.reference_drift.clone(),
            reference_perf: self.monitoring.reference_perf.clone(),
            interval_secs: self.monitoring.interval_secs,
        }
    }
}

fn parse<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e| {
            ForecastError::InvalidParameter(format!("Invalid {} '{}': {}", key, raw, e))
        }),
        None => Ok(default),
    }
}

impl Default for Config {
    fn default() -> Self {
        let manager = ManagerConfig::default();
        let monitoring = MonitoringConfig::default();
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
                max_predictions: 336,
            },
            model: ModelConfig {
                name: manager.model_name,
                registry_dir: PathBuf::from("model_registry"),
                check_interval_secs: manager.check_interval_secs,
            },
            monitoring: MonitoringSettings {
                metrics_db: monitoring.report_dir.join("db").join("metrics.db"),
                log_dir: monitoring.log_dir,
                report_dir: monitoring.report_dir,
                reference_drift: monitoring.reference_drift,
                reference_perf: monitoring.reference_perf,
                interval_secs: monitoring.interval_secs,
            },
            tracking: TrackingConfig {
                uri: None,
                experiment: "consumption_forecasting_monitoring".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.max_predictions, 336);
        assert_eq!(config.model.name, "timeseries_xgboost_30min");
        assert_eq!(config.model.check_interval_secs, 300);
        assert_eq!(config.monitoring.interval_secs, 500);
        assert_eq!(config.monitoring.metrics_db, PathBuf::from("reports/db/metrics.db"));
        assert!(config.tracking.uri.is_none());
    }

    #[test]
    fn test_server_address() {
        let config = Config::default();
        assert_eq!(config.server_address(), "0.0.0.0:8000");
    }

    #[test]
    fn test_overrides_from_lookup() {
        let config = Config::from_lookup(lookup_from(&[
            ("SERVER_PORT", "9100"),
            ("MODEL_NAME", "consumption_linear"),
            ("LOG_DIR", "/var/log/forecast"),
            ("MLFLOW_TRACKING_URI", "http://mlflow:5000"),
        ]))
        .unwrap();

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.manager_config().model_name, "consumption_linear");
        assert_eq!(
            config.monitoring_config().prediction_log(),
            PathBuf::from("/var/log/forecast/predictions.jsonl")
        );
        assert_eq!(config.tracking.uri.as_deref(), Some("http://mlflow:5000"));
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let result = Config::from_lookup(lookup_from(&[("MODEL_CHECK_INTERVAL_SECS", "soon")]));
        assert!(matches!(result, Err(ForecastError::InvalidParameter(_))));
    }

    #[test]
    fn test_blank_tracking_uri_disables_tracking() {
        let config = Config::from_lookup(lookup_from(&[("MLFLOW_TRACKING_URI", "  ")])).unwrap();
        assert!(config.tracking.uri.is_none());
    }
}
