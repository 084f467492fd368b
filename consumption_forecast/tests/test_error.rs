use consumption_forecast::ForecastError;
use consumption_math::MathError;
use std::io;

#[test]
fn test_error_messages() {
    let err = ForecastError::NotReady("no version loaded".to_string());
    assert_eq!(err.to_string(), "Model not ready: no version loaded");

    let err = ForecastError::ValidationError("bad row".to_string());
    assert_eq!(err.to_string(), "Validation error: bad row");

    let err = ForecastError::DataUnavailable("logs/predictions.jsonl not found".to_string());
    assert_eq!(
        err.to_string(),
        "Data unavailable: logs/predictions.jsonl not found"
    );
}

#[test]
fn test_conversions() {
    let err: ForecastError = io::Error::new(io::ErrorKind::PermissionDenied, "denied").into();
    assert!(matches!(err, ForecastError::IoError(_)));

    let err: ForecastError = serde_json::from_str::<Vec<f64>>("[1,").unwrap_err().into();
    assert!(matches!(err, ForecastError::JsonError(_)));

    let err: ForecastError = MathError::InsufficientData("empty".to_string()).into();
    assert!(matches!(err, ForecastError::MathError(_)));
    assert!(err.to_string().starts_with("Math error:"));
}

#[test]
fn test_transient_errors() {
    assert!(ForecastError::NotReady(String::new()).is_transient());
    assert!(ForecastError::RegistryError(String::new()).is_transient());
    assert!(!ForecastError::ValidationError(String::new()).is_transient());
    assert!(!ForecastError::StorageError(String::new()).is_transient());
}
