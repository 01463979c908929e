//! Response types for the web API.

use serde::{Deserialize, Serialize};

/// Prediction response: the model's score rounded to two decimals.
#[derive(Debug, Serialize, Deserialize)]
pub struct ScoreResponse {
    pub score: f64,
}

impl ScoreResponse {
    pub fn from_score(score: f32) -> Self {
        Self {
            score: round_score(score),
        }
    }
}

/// Round to two decimal places, exact ties to the even digit.
///
/// Widening an f32 and scaling by 100 is exact for the representable ties
/// (0.125, 0.375, ...), so they land on `x.5` and go to even.
pub fn round_score(score: f32) -> f64 {
    (f64::from(score) * 100.0).round_ties_even() / 100.0
}

/// Model information response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelInfoResponse {
    /// Whether a model is currently loaded
    pub loaded: bool,
    /// Path to the loaded model file
    pub path: Option<String>,
    /// When the model file was last modified (Unix timestamp)
    pub file_modified: Option<u64>,
    /// When the model was loaded into memory (Unix timestamp)
    pub loaded_at: Option<u64>,
    pub input_width: u32,
    pub input_height: u32,
    /// Tensor layout fed to the model ("nhwc" or "nchw")
    pub layout: String,
    /// Human-readable status message
    pub status: String,
}
