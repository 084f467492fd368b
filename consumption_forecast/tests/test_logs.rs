use consumption_forecast::logs::{
    read_jsonl, EventLogs, FeedbackRecord, JsonlLog, PredictionRecord, FEEDBACK_LOG_FILE,
    PREDICTION_LOG_FILE,
};
use consumption_forecast::ForecastError;
use pretty_assertions::assert_eq;
use std::fs;
use std::io::Write;
use std::sync::Arc;
use std::thread;
use tempfile::tempdir;

#[test]
fn test_prediction_appends_one_line() {
    let dir = tempdir().unwrap();
    let logs = EventLogs::open(dir.path()).unwrap();

    let record = logs
        .log_prediction(
            vec![vec![1.0, 2.0, 3.0]],
            vec![vec![4.0, 5.0]],
            "consumption",
            "7",
            2,
            "abc",
        )
        .unwrap();

    assert_eq!(
        logs.prediction_log_path(),
        dir.path().join(PREDICTION_LOG_FILE).as_path()
    );
    let text = fs::read_to_string(logs.prediction_log_path()).unwrap();
    assert_eq!(text.lines().count(), 1);

    let stored: Vec<PredictionRecord> = read_jsonl(logs.prediction_log_path()).unwrap();
    assert_eq!(stored, vec![record.clone()]);
    assert_eq!(record.n_inputs, 1);
    assert_eq!(record.n_outputs, 1);
    assert_eq!(record.n_predictions, 2);
    assert_eq!(record.model_version, "7");
}

#[test]
fn test_feedback_uses_outputs_field() {
    let dir = tempdir().unwrap();
    let logs = EventLogs::open(dir.path()).unwrap();

    logs.log_feedback(vec![vec![1.0, 2.0]], vec![vec![3.5]], "abc")
        .unwrap();

    let line = fs::read_to_string(dir.path().join(FEEDBACK_LOG_FILE)).unwrap();
    let value: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
    assert_eq!(value["prediction_id"], "abc");
    assert_eq!(value["outputs"], serde_json::json!([[3.5]]));
    assert!(value.get("true_values").is_none());
}

#[test]
fn test_records_validate_shape() {
    let mismatched = PredictionRecord::new(
        vec![vec![1.0], vec![2.0]],
        vec![vec![3.0]],
        "m",
        "1",
        1,
        "id",
    );
    assert!(matches!(mismatched, Err(ForecastError::ValidationError(_))));

    let wrong_steps = PredictionRecord::new(vec![vec![1.0]], vec![vec![3.0]], "m", "1", 2, "id");
    assert!(matches!(wrong_steps, Err(ForecastError::ValidationError(_))));

    let no_id = FeedbackRecord::new(vec![vec![1.0]], vec![vec![2.0]], "  ");
    assert!(matches!(no_id, Err(ForecastError::ValidationError(_))));

    let empty_row = FeedbackRecord::new(vec![vec![1.0]], vec![vec![]], "id");
    assert!(matches!(empty_row, Err(ForecastError::ValidationError(_))));

    let no_rows = FeedbackRecord::new(vec![], vec![], "id");
    assert!(matches!(no_rows, Err(ForecastError::ValidationError(_))));
}

#[test]
fn test_invalid_record_writes_nothing() {
    let dir = tempdir().unwrap();
    let logs = EventLogs::open(dir.path()).unwrap();

    let result = logs.log_feedback(vec![vec![1.0]], vec![vec![1.0], vec![2.0]], "abc");
    assert!(result.is_err());

    let text = fs::read_to_string(logs.feedback_log_path()).unwrap_or_default();
    assert!(text.is_empty());
}

#[test]
fn test_concurrent_appends_keep_lines_whole() {
    let dir = tempdir().unwrap();
    let log = Arc::new(JsonlLog::<FeedbackRecord>::open(dir.path().join("feedback.jsonl")).unwrap());

    let writers: Vec<_> = (0..8)
        .map(|t| {
            let log = Arc::clone(&log);
            thread::spawn(move || {
                for i in 0..25 {
                    let record = FeedbackRecord::new(
                        vec![vec![t as f64; 48]],
                        vec![vec![i as f64; 4]],
                        format!("{}-{}", t, i),
                    )
                    .unwrap();
                    log.append(&record).unwrap();
                }
            })
        })
        .collect();
    for writer in writers {
        writer.join().unwrap();
    }

    let records: Vec<FeedbackRecord> = read_jsonl(log.path()).unwrap();
    assert_eq!(records.len(), 200);
}

#[test]
fn test_malformed_lines_are_skipped() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ground_truth.jsonl");
    let good = FeedbackRecord::new(vec![vec![1.0]], vec![vec![2.0]], "ok").unwrap();

    let mut file = fs::File::create(&path).unwrap();
    writeln!(file, "{}", serde_json::to_string(&good).unwrap()).unwrap();
    writeln!(file, "{{\"prediction_id\": \"torn").unwrap();
    writeln!(file).unwrap();
    writeln!(file, "{}", serde_json::to_string(&good).unwrap()).unwrap();
    drop(file);

    let records: Vec<FeedbackRecord> = read_jsonl(&path).unwrap();
    assert_eq!(records, vec![good.clone(), good]);
}

#[test]
fn test_missing_log_is_data_unavailable() {
    let dir = tempdir().unwrap();
    let result: Result<Vec<PredictionRecord>, _> = read_jsonl(dir.path().join("nope.jsonl"));
    assert!(matches!(result, Err(ForecastError::DataUnavailable(_))));
}
