//! Model info handler.

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::metrics;
use crate::types::ModelInfoResponse;
use crate::AppState;

/// Get info about the loaded model.
pub async fn get_model_info(State(state): State<Arc<AppState>>) -> Json<ModelInfoResponse> {
    let _timer = metrics::request_timer("/model", "GET");
    let info = &state.model_info;

    let status = if info.loaded {
        "Model loaded".to_string()
    } else {
        "No model loaded".to_string()
    };

    Json(ModelInfoResponse {
        loaded: info.loaded,
        path: info.path.clone(),
        file_modified: info.file_modified,
        loaded_at: info.loaded_at,
        input_width: state.input_spec.width,
        input_height: state.input_spec.height,
        layout: state.input_spec.layout.to_string(),
        status,
    })
}
