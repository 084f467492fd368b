use assert_approx_eq::assert_approx_eq;
use consumption_math::regression::{
    mean_absolute_error, mean_absolute_percentage_error, mean_squared_error, r2_score,
    root_mean_squared_error,
};
use consumption_math::{MathError, RegressionMetrics};

#[test]
fn test_regression_metrics() {
    let actual = vec![10.0, 20.0, 30.0, 40.0, 50.0];
    let predicted = vec![12.0, 18.0, 33.0, 37.0, 52.0];

    // Test MAE
    let mae = mean_absolute_error(&actual, &predicted).unwrap();
    assert_approx_eq!(mae, 2.4, 0.01);

    // Test MSE
    let mse = mean_squared_error(&actual, &predicted).unwrap();
    assert_approx_eq!(mse, 6.0, 0.01);

    // Test RMSE
    let rmse = root_mean_squared_error(&actual, &predicted).unwrap();
    assert_approx_eq!(rmse, 2.449, 0.001);

    // Test R2: ss_tot = 1000, ss_res = 30
    let r2 = r2_score(&actual, &predicted).unwrap();
    assert_approx_eq!(r2, 0.97, 0.001);

    // Test MAPE
    let mape = mean_absolute_percentage_error(&actual, &predicted).unwrap();
    assert!(mape > 0.0 && mape < 0.15);
}

#[test]
fn test_metrics_bundle() {
    let actual = vec![1.0, 2.0, 3.0];
    let predicted = vec![1.0, 2.0, 3.0];

    let metrics = RegressionMetrics::evaluate(&actual, &predicted).unwrap();
    assert_eq!(metrics.count, 3);
    assert_approx_eq!(metrics.mae, 0.0);
    assert_approx_eq!(metrics.rmse, 0.0);
    assert_eq!(metrics.r2, Some(1.0));

    let display = format!("{}", metrics);
    assert!(display.contains("RMSE"));
}

#[test]
fn test_constant_target_has_no_r2() {
    let actual = vec![5.0, 5.0, 5.0];
    let predicted = vec![4.0, 5.0, 6.0];

    assert!(matches!(
        r2_score(&actual, &predicted),
        Err(MathError::CalculationError(_))
    ));

    let metrics = RegressionMetrics::evaluate(&actual, &predicted).unwrap();
    assert!(metrics.r2.is_none());
    assert_approx_eq!(metrics.mae, 2.0 / 3.0, 1e-9);
}

#[test]
fn test_error_handling() {
    // Empty input
    let empty: Vec<f64> = vec![];
    assert!(matches!(
        mean_absolute_error(&empty, &empty),
        Err(MathError::InsufficientData(_))
    ));

    // Mismatched lengths
    let result = mean_squared_error(&[1.0, 2.0, 3.0], &[1.0, 2.0]);
    assert!(matches!(result, Err(MathError::InvalidInput(_))));

    // Non-finite values
    assert!(RegressionMetrics::evaluate(&[1.0, f64::NAN], &[1.0, 2.0]).is_err());
}
