use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use consumption_api::{create_router, AppState};
use consumption_forecast::logs::{read_jsonl, FeedbackRecord, PredictionRecord};
use consumption_forecast::models::ModelArtifact;
use consumption_forecast::registry::{FsModelRegistry, Stage};
use consumption_forecast::{EventLogs, ModelManager};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tempfile::{tempdir, TempDir};
use tower::ServiceExt;

const MODEL: &str = "timeseries_xgboost_30min";

struct TestApp {
    dir: TempDir,
    manager: Arc<ModelManager>,
    logs: Arc<EventLogs>,
}

impl TestApp {
    /// App backed by a filesystem registry, optionally holding a model
    fn new(with_model: bool) -> Self {
        let dir = tempdir().unwrap();
        let registry = FsModelRegistry::open(dir.path().join("registry")).unwrap();
        if with_model {
            registry
                .register(
                    MODEL,
                    &ModelArtifact::Linear {
                        weights: vec![0.0, 0.0, 1.0],
                        intercept: 1.0,
                    },
                    Stage::Production,
                )
                .unwrap();
        }

        let manager = Arc::new(ModelManager::new(
            MODEL,
            Arc::new(registry),
            Duration::from_secs(300),
        ));
        manager.load_model();
        let logs = Arc::new(EventLogs::open(dir.path().join("logs")).unwrap());

        Self { dir, manager, logs }
    }

    fn router(&self) -> Router {
        create_router(Arc::new(AppState::new(
            Arc::clone(&self.manager),
            Arc::clone(&self.logs),
            10,
        )))
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.send(request).await
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }
}

#[tokio::test]
async fn test_root() {
    let app = TestApp::new(false);
    let (status, body) = app.get("/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Welcome to Consumption Forecasting API");
}

#[tokio::test]
async fn test_health_reports_loading_then_ready() {
    let loading = TestApp::new(false);
    let (status, body) = loading.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "loading");
    assert_eq!(body["model_version"], Value::Null);

    let ready = TestApp::new(true);
    let (_, body) = ready.get("/health").await;
    assert_eq!(body["status"], "ready");
    assert_eq!(body["model_name"], MODEL);
    assert_eq!(body["model_version"], "1");
}

#[tokio::test]
async fn test_predict_returns_forecast_and_logs_it() {
    let app = TestApp::new(true);

    let (status, body) = app
        .post(
            "/predict",
            json!({"features": [[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]], "n_predictions": 3}),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    // Last value plus one, repeated
    assert_eq!(body["predictions"], json!([[4.0, 5.0, 6.0], [7.0, 8.0, 9.0]]));
    assert_eq!(body["model_version"], "1");
    let id = body["prediction_id"].as_str().unwrap().to_string();
    assert!(!id.is_empty());

    let records: Vec<PredictionRecord> = read_jsonl(app.logs.prediction_log_path()).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].prediction_id, id);
    assert_eq!(records[0].n_predictions, 3);
    assert_eq!(records[0].model_version, "1");
    assert!(app.dir.path().join("logs").join("predictions.jsonl").is_file());
}

#[tokio::test]
async fn test_predict_defaults_to_one_step() {
    let app = TestApp::new(true);
    let (status, body) = app.post("/predict", json!({"features": [[1.0, 2.0, 3.0]]})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["predictions"], json!([[4.0]]));
}

#[tokio::test]
async fn test_distinct_predictions_get_distinct_ids() {
    let app = TestApp::new(true);
    let request = json!({"features": [[1.0, 2.0, 3.0]], "n_predictions": 1});

    let (_, first) = app.post("/predict", request.clone()).await;
    let (_, second) = app.post("/predict", request).await;

    assert_ne!(first["prediction_id"], second["prediction_id"]);
    let records: Vec<PredictionRecord> = read_jsonl(app.logs.prediction_log_path()).unwrap();
    assert_eq!(records.len(), 2);
}

#[tokio::test]
async fn test_predict_without_model_is_server_error() {
    let app = TestApp::new(false);
    let (status, body) = app
        .post("/predict", json!({"features": [[1.0, 2.0, 3.0]]}))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "model_not_ready");
}

#[tokio::test]
async fn test_predict_rejects_bad_requests() {
    let app = TestApp::new(true);

    let (status, _) = app
        .post("/predict", json!({"features": [[1.0, 2.0, 3.0]], "n_predictions": 11}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .post("/predict", json!({"features": [[1.0, 2.0, 3.0], [1.0]]}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    // Width differs from the model's three weights
    let (status, _) = app
        .post("/predict", json!({"features": [[1.0, 2.0, 3.0, 4.0]]}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(read_jsonl::<PredictionRecord, _>(app.logs.prediction_log_path()).is_err());
}

#[tokio::test]
async fn test_feedback_is_saved() {
    let app = TestApp::new(true);

    let (status, body) = app
        .post(
            "/feedback",
            json!({"prediction_id": "abc", "inputs": [[1.0, 2.0, 3.0]], "outputs": [[4.2, 5.1]]}),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Feedback saved");
    let records: Vec<FeedbackRecord> = read_jsonl(app.logs.feedback_log_path()).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].prediction_id, "abc");
    assert_eq!(records[0].outputs, vec![vec![4.2, 5.1]]);
}

#[tokio::test]
async fn test_feedback_rejects_malformed_payloads() {
    let app = TestApp::new(true);

    let (status, _) = app
        .post(
            "/feedback",
            json!({"prediction_id": "abc", "inputs": [[1.0]], "true_values": [[2.0]]}),
        )
        .await;
    assert!(status.is_client_error());

    let (status, _) = app
        .post(
            "/feedback",
            json!({"prediction_id": "abc", "inputs": [[1.0], [2.0]], "outputs": [[2.0]]}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
