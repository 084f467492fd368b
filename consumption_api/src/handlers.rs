use axum::{extract::State, Json};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::dto::{FeedbackRequest, HealthResponse, MessageResponse, PredictRequest, PredictResponse};
use crate::error::{ApiError, Result};
use crate::state::AppState;

pub async fn root() -> Json<MessageResponse> {
    Json(MessageResponse::new("Welcome to Consumption Forecasting API"))
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let model_version = state.manager.current_version();
    let status = if model_version.is_some() {
        "ready"
    } else {
        "loading"
    };
    Json(HealthResponse {
        status: status.to_string(),
        model_name: state.manager.model_name().to_string(),
        model_version,
    })
}

/// Forecast the requested steps and log the served prediction
pub async fn predict(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PredictRequest>,
) -> Result<Json<PredictResponse>> {
    if request.n_predictions > state.max_predictions {
        return Err(ApiError::BadRequest(format!(
            "n_predictions must be at most {}, got {}",
            state.max_predictions, request.n_predictions
        )));
    }

    let prediction_id = Uuid::new_v4().to_string();
    let PredictRequest {
        features,
        n_predictions,
    } = request;
    let id = prediction_id.clone();

    // Forecasting and the log append are both blocking
    let served = tokio::task::spawn_blocking(move || {
        let served = state.manager.predict(&features, n_predictions)?;
        state.logs.log_prediction(
            features,
            served.predictions.clone(),
            &served.model_name,
            &served.model_version,
            n_predictions,
            &id,
        )?;
        Ok::<_, ApiError>(served)
    })
    .await??;

    debug!(
        prediction_id = %prediction_id,
        rows = served.predictions.len(),
        steps = n_predictions,
        version = %served.model_version,
        "served prediction"
    );

    Ok(Json(PredictResponse {
        predictions: served.predictions,
        prediction_id,
        model_version: served.model_version,
    }))
}

/// Store ground truth for an earlier prediction
pub async fn feedback(
    State(state): State<Arc<AppState>>,
    Json(request): Json<FeedbackRequest>,
) -> Result<Json<MessageResponse>> {
    let FeedbackRequest {
        prediction_id,
        inputs,
        outputs,
    } = request;

    let record = tokio::task::spawn_blocking(move || {
        state.logs.log_feedback(inputs, outputs, &prediction_id)
    })
    .await??;

    info!(prediction_id = %record.prediction_id, "feedback saved");
    Ok(Json(MessageResponse::new("Feedback saved")))
}
