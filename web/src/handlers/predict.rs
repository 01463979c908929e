//! Image upload → score handler.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::warn;

use crate::metrics;
use crate::prediction::{score_upload, PredictError};
use crate::types::ScoreResponse;
use crate::AppState;

/// Score an uploaded image.
///
/// Expects `multipart/form-data` with the image in the configured field
/// (`file` by default).
pub async fn predict(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<ScoreResponse>, (StatusCode, String)> {
    let timer = metrics::request_timer("/", "POST");
    let result = handle_upload(state, multipart).await;
    timer.observe_duration();

    match result {
        Ok(score) => {
            metrics::PREDICTIONS.inc();
            Ok(Json(ScoreResponse::from_score(score)))
        }
        Err(e) => {
            metrics::UPLOADS_REJECTED
                .with_label_values(&[e.reason()])
                .inc();
            warn!("Prediction rejected: {}", e);
            Err(e.into_rejection())
        }
    }
}

async fn handle_upload(
    state: Arc<AppState>,
    mut multipart: Multipart,
) -> Result<f32, PredictError> {
    let (file_name, bytes) = read_file_field(&mut multipart, &state.upload.form_field).await?;
    let extension = state.upload.validate_extension(&file_name)?;

    tokio::task::spawn_blocking(move || {
        score_upload(
            &state.upload,
            state.classifier.as_ref(),
            &state.input_spec,
            &extension,
            &bytes,
        )
    })
    .await
    .map_err(|e| PredictError::Task(e.to_string()))?
}

/// Find the named file field and read it fully. Other fields are skipped.
async fn read_file_field(
    multipart: &mut Multipart,
    form_field: &str,
) -> Result<(String, Vec<u8>), PredictError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(form_field) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await?;
        return Ok((file_name, bytes.to_vec()));
    }
    Err(PredictError::MissingField(form_field.to_string()))
}
