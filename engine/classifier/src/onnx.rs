//! ONNX Runtime classifier.
//!
//! Runs a pre-exported image classifier. The model is expected to have:
//! - Input: one float32 image tensor, shape (1, H, W, 3) or (1, 3, H, W)
//! - Output: first output holds the score(s), shape (1, 1) or (1,)
//!
//! The input name defaults to the session's first input.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use ort::{session::Session, value::Tensor};
use tracing::{debug, info};

use crate::classifier::{Classifier, ClassifierError};
use crate::preprocess::ImageTensor;

/// ONNX Runtime classifier that loads and runs an image model.
///
/// Uses a Mutex internally because `Session::run` requires `&mut self`,
/// but the `Classifier` trait uses `&self` for sharing across requests.
pub struct OnnxClassifier {
    session: Mutex<Session>,
    input_name: String,
    inference_count: AtomicU64,
    total_inference_time_us: AtomicU64,
}

impl std::fmt::Debug for OnnxClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxClassifier")
            .field("input_name", &self.input_name)
            .finish_non_exhaustive()
    }
}

impl OnnxClassifier {
    /// Load an ONNX model from the given path.
    ///
    /// # Arguments
    /// * `model_path` - Path to the .onnx model file
    /// * `input_name` - Graph input to feed, or `None` for the first input
    /// * `intra_threads` - ONNX Runtime intra-op thread count
    pub fn load<P: AsRef<Path>>(
        model_path: P,
        input_name: Option<&str>,
        intra_threads: usize,
    ) -> Result<Self, ClassifierError> {
        let model_path = model_path.as_ref();
        if !model_path.is_file() {
            return Err(ClassifierError::ModelError(format!(
                "Model not stored at {}; cannot load model",
                model_path.display()
            )));
        }

        let session = Session::builder()
            .map_err(|e| {
                ClassifierError::ModelError(format!("Failed to create session builder: {}", e))
            })?
            .with_intra_threads(intra_threads)
            .map_err(|e| ClassifierError::ModelError(format!("Failed to set intra threads: {}", e)))?
            .commit_from_file(model_path)
            .map_err(|e| ClassifierError::ModelError(format!("Failed to load model: {}", e)))?;

        Self::from_session(session, input_name)
    }

    /// Load an ONNX model from memory.
    pub fn load_from_memory(
        model_data: &[u8],
        input_name: Option<&str>,
    ) -> Result<Self, ClassifierError> {
        let session = Session::builder()
            .map_err(|e| {
                ClassifierError::ModelError(format!("Failed to create session builder: {}", e))
            })?
            .with_intra_threads(1)
            .map_err(|e| ClassifierError::ModelError(format!("Failed to set intra threads: {}", e)))?
            .commit_from_memory(model_data)
            .map_err(|e| {
                ClassifierError::ModelError(format!("Failed to load model from memory: {}", e))
            })?;

        Self::from_session(session, input_name)
    }

    fn from_session(session: Session, input_name: Option<&str>) -> Result<Self, ClassifierError> {
        let input_name = match input_name {
            Some(name) => name.to_string(),
            None => session
                .inputs()
                .first()
                .map(|input| input.name().to_string())
                .ok_or_else(|| ClassifierError::ModelError("Model has no inputs".to_string()))?,
        };
        info!(input = %input_name, "ONNX classifier ready");

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            inference_count: AtomicU64::new(0),
            total_inference_time_us: AtomicU64::new(0),
        })
    }
}

impl Classifier for OnnxClassifier {
    fn classify(&self, input: &ImageTensor) -> Result<f32, ClassifierError> {
        let dims = input.shape();
        let shape = [dims[0] as i64, dims[1] as i64, dims[2] as i64, dims[3] as i64];
        let input_value = Tensor::from_array((shape, input.to_vec().into_boxed_slice()))
            .map_err(|e| {
                ClassifierError::InvalidInput(format!("Failed to create input tensor: {}", e))
            })?;

        // Run inference - extract the score inside the lock scope
        let inference_start = Instant::now();
        let score = {
            let mut session = self.session.lock().map_err(|e| {
                ClassifierError::InferenceFailed(format!("Failed to acquire session lock: {}", e))
            })?;
            let outputs = session
                .run(ort::inputs![self.input_name.as_str() => input_value])
                .map_err(|e| ClassifierError::InferenceFailed(format!("Inference failed: {}", e)))?;

            let (_shape, data) = outputs[0].try_extract_tensor::<f32>().map_err(|e| {
                ClassifierError::ModelError(format!("Failed to extract output tensor: {}", e))
            })?;

            data.first().copied().ok_or_else(|| {
                ClassifierError::ModelError("Model produced an empty output".to_string())
            })?
        };

        let inference_time_us = inference_start.elapsed().as_micros() as u64;
        let total_us = self
            .total_inference_time_us
            .fetch_add(inference_time_us, Ordering::Relaxed)
            + inference_time_us;
        let count = self.inference_count.fetch_add(1, Ordering::Relaxed) + 1;

        #[allow(clippy::manual_is_multiple_of)]
        if count % 100 == 0 {
            debug!(
                "ONNX inference stats: {} calls, avg {:.2}ms per call",
                count,
                total_us as f64 / count as f64 / 1000.0
            );
        }

        Ok(score)
    }
}
