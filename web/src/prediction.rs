//! The per-request scoring pipeline.
//!
//! persist upload → (GIF → PNG) → decode + resize + tensorize → delete
//! upload → forward pass. Everything here is blocking and runs on the
//! blocking thread pool.

use std::time::Instant;

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use classifier::{load_image_tensor, Classifier, ClassifierError, InputSpec};
use image::ImageError;
use thiserror::Error;
use tracing::info;

use crate::metrics;
use crate::normalize::{rewrite_gif_to_png, GIF_EXTENSION};
use crate::upload::{TempUpload, UploadSettings};

/// Everything that can go wrong while scoring one upload.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("Missing multipart field '{0}'")]
    MissingField(String),

    #[error("Malformed multipart body: {0}")]
    Multipart(#[from] MultipartError),

    #[error("Invalid file extension; got {got} instead of allowed: [{allowed}]")]
    InvalidExtension { got: String, allowed: String },

    #[error("Failed to store upload: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to decode image: {0}")]
    Decode(ImageError),

    #[error("Failed to score image: {0}")]
    Classifier(ClassifierError),

    #[error("Prediction task failed: {0}")]
    Task(String),
}

impl From<ClassifierError> for PredictError {
    fn from(e: ClassifierError) -> Self {
        match e {
            ClassifierError::Image(e) => e.into(),
            ClassifierError::Io(e) => Self::Io(e),
            other => Self::Classifier(other),
        }
    }
}

impl From<ImageError> for PredictError {
    fn from(e: ImageError) -> Self {
        match e {
            ImageError::IoError(e) => Self::Io(e),
            other => Self::Decode(other),
        }
    }
}

impl PredictError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Multipart(e) => e.status(),
            Self::MissingField(_) | Self::InvalidExtension { .. } | Self::Decode(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Io(_) | Self::Classifier(_) | Self::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label for the rejection metric.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MissingField(_) => "missing_field",
            Self::Multipart(_) => "multipart",
            Self::InvalidExtension { .. } => "extension",
            Self::Io(_) => "io",
            Self::Decode(_) => "decode",
            Self::Classifier(_) => "inference",
            Self::Task(_) => "task",
        }
    }

    /// Status and text body for the HTTP response.
    pub fn into_rejection(self) -> (StatusCode, String) {
        (self.status(), self.to_string())
    }
}

/// Score one validated upload.
///
/// The upload is deleted before the forward pass, and on every error path.
pub fn score_upload(
    settings: &UploadSettings,
    classifier: &dyn Classifier,
    spec: &InputSpec,
    extension: &str,
    bytes: &[u8],
) -> Result<f32, PredictError> {
    let mut upload = TempUpload::persist(&settings.dir, extension, bytes)?;
    let upload_id = upload.id();

    if extension == GIF_EXTENSION {
        rewrite_gif_to_png(&mut upload)?;
        metrics::GIF_CONVERSIONS.inc();
    }

    let tensor = load_image_tensor(upload.path(), spec)?;
    drop(upload);

    let started = Instant::now();
    let score = classifier
        .classify(&tensor)
        .map_err(PredictError::Classifier)?;
    metrics::INFERENCE_SECONDS.observe(started.elapsed().as_secs_f64());

    if !score.is_finite() {
        return Err(PredictError::Classifier(ClassifierError::InferenceFailed(
            format!("model returned a non-finite score ({})", score),
        )));
    }

    info!(upload_id = %upload_id, extension, score, "Scored upload");
    Ok(score)
}
