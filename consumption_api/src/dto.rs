//! Request and response bodies

use serde::{Deserialize, Serialize};

fn one() -> usize {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictRequest {
    /// One Feature Window per row
    pub features: Vec<Vec<f64>>,
    #[serde(default = "one")]
    pub n_predictions: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub predictions: Vec<Vec<f64>>,
    pub prediction_id: String,
    pub model_version: String,
}

/// Ground truth for an earlier prediction
///
/// True values travel in `outputs`, mirroring the prediction log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeedbackRequest {
    pub prediction_id: String,
    pub inputs: Vec<Vec<f64>>,
    pub outputs: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `ready` once a model is loaded, `loading` before
    pub status: String,
    pub model_name: String,
    pub model_version: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_n_predictions_defaults_to_one() {
        let request: PredictRequest = serde_json::from_str(r#"{"features": [[1.0, 2.0]]}"#).unwrap();
        assert_eq!(request.n_predictions, 1);
    }

    #[test]
    fn test_feedback_rejects_true_values_field() {
        let result = serde_json::from_str::<FeedbackRequest>(
            r#"{"prediction_id": "abc", "inputs": [[1.0]], "outputs": [[2.0]], "true_values": [[2.0]]}"#,
        );
        assert!(result.is_err());
    }
}
