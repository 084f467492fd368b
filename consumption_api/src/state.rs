use consumption_forecast::{EventLogs, ModelManager};
use std::sync::Arc;

/// Shared handles of the serving surface
#[derive(Debug, Clone)]
pub struct AppState {
    pub manager: Arc<ModelManager>,
    pub logs: Arc<EventLogs>,
    pub max_predictions: usize,
}

impl AppState {
    pub fn new(manager: Arc<ModelManager>, logs: Arc<EventLogs>, max_predictions: usize) -> Self {
        Self {
            manager,
            logs,
            max_predictions,
        }
    }
}
