//! # Consumption Forecasting
//!
//! Umbrella crate of the consumption forecasting workspace.
//!
//! - [`math`]: regression metrics and drift tests
//! - [`forecast`]: models, the Model Manager, logs and monitoring
//! - [`api`]: the HTTP serving surface
//!
//! ## Example
//!
//! ```
//! use consumption_forecasting_workspace::forecast::autoregressive::forecast_rows;
//! use consumption_forecasting_workspace::forecast::models::MovingAverageModel;
//! use consumption_forecasting_workspace::math::detect_drift;
//!
//! let model = MovingAverageModel::new("ma", 2).unwrap();
//! let forecast = forecast_rows(&model, &[vec![1.0, 3.0]], 2).unwrap();
//! assert_eq!(forecast, vec![vec![2.0, 2.5]]);
//!
//! let reference: Vec<f64> = (0..100).map(|v| v as f64).collect();
//! let result = detect_drift(&reference, &reference).unwrap();
//! assert!(!result.drift_detected);
//! ```

pub use consumption_api as api;
pub use consumption_forecast as forecast;
pub use consumption_math as math;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reexports() {
        let config = api::Config::default();
        assert_eq!(config.model.name, forecast::ManagerConfig::default().model_name);
        assert_eq!(
            math::DriftMethod::for_reference_size(10),
            math::DriftMethod::KolmogorovSmirnov
        );
    }
}
