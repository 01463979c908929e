//! Classifier trait for image scoring.
//!
//! A classifier takes one preprocessed image tensor and returns the first
//! (and only) element of the model's output batch. In production this is an
//! ONNX Runtime session; tests use a constant classifier.

use thiserror::Error;

use crate::preprocess::ImageTensor;

/// Errors that can occur while preparing an image or scoring it.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Model error: {0}")]
    ModelError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Inference failed: {0}")]
    InferenceFailed(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for image classifiers.
///
/// Implementations must be shareable across request handlers, so the trait
/// requires `Send + Sync` and takes `&self`.
pub trait Classifier: Send + Sync {
    /// Run one forward pass on a batch-of-one tensor and return its score.
    fn classify(&self, input: &ImageTensor) -> Result<f32, ClassifierError>;
}

/// Classifier that returns the same score for every input.
/// Useful for exercising the HTTP layer without a model.
#[derive(Debug, Clone, Copy)]
pub struct ConstantClassifier {
    score: f32,
}

impl ConstantClassifier {
    pub fn new(score: f32) -> Self {
        Self { score }
    }
}

impl Default for ConstantClassifier {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl Classifier for ConstantClassifier {
    fn classify(&self, input: &ImageTensor) -> Result<f32, ClassifierError> {
        if input.batch_size() != 1 {
            return Err(ClassifierError::InvalidInput(format!(
                "Expected a batch of 1, got {}",
                input.batch_size()
            )));
        }
        Ok(self.score)
    }
}
