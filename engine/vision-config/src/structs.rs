//! Configuration struct definitions.
//!
//! All config structs with serde deserialization support and default values.

use crate::defaults;
use serde::Deserialize;

// ============================================================================
// Serde default functions (required for #[serde(default = "...")])
// ============================================================================

fn d_log_level() -> String {
    defaults::log_level().into()
}
fn d_host() -> String {
    defaults::host().into()
}
fn d_port() -> u16 {
    defaults::port()
}
fn d_upload_dir() -> String {
    defaults::upload_dir().into()
}
fn d_form_field() -> String {
    defaults::form_field().into()
}
fn d_allowed_extensions() -> Vec<String> {
    defaults::allowed_extensions().to_vec()
}
fn d_max_bytes() -> usize {
    defaults::max_bytes()
}
fn d_model_path() -> String {
    defaults::model_path().into()
}
fn d_input_width() -> u32 {
    defaults::input_width()
}
fn d_input_height() -> u32 {
    defaults::input_height()
}
fn d_layout() -> String {
    defaults::layout().into()
}
fn d_intra_threads() -> usize {
    defaults::intra_threads()
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Root configuration structure matching config.toml
#[derive(Debug, Deserialize, Default, Clone)]
pub struct CentralConfig {
    #[serde(default)]
    pub common: CommonConfig,
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub model: ModelConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CommonConfig {
    #[serde(default = "d_log_level")]
    pub log_level: String,
}

impl Default for CommonConfig {
    fn default() -> Self {
        Self {
            log_level: defaults::log_level().into(),
        }
    }
}

/// Web server configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WebConfig {
    #[serde(default = "d_host")]
    pub host: String,
    #[serde(default = "d_port")]
    pub port: u16,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: defaults::host().into(),
            port: defaults::port(),
        }
    }
}

/// Where and how uploaded images are accepted
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct UploadConfig {
    /// Working directory for in-flight uploads (created if absent)
    #[serde(default = "d_upload_dir")]
    pub dir: String,
    /// Multipart field carrying the image
    #[serde(default = "d_form_field")]
    pub form_field: String,
    /// Accepted extensions, dot included, matched case-sensitively
    #[serde(default = "d_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
    /// Request body limit in bytes
    #[serde(default = "d_max_bytes")]
    pub max_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: defaults::upload_dir().into(),
            form_field: defaults::form_field().into(),
            allowed_extensions: defaults::allowed_extensions().to_vec(),
            max_bytes: defaults::max_bytes(),
        }
    }
}

/// Model artifact and input tensor configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ModelConfig {
    #[serde(default = "d_model_path")]
    pub path: String,
    #[serde(default = "d_input_width")]
    pub input_width: u32,
    #[serde(default = "d_input_height")]
    pub input_height: u32,
    /// Tensor layout: "nhwc" or "nchw"
    #[serde(default = "d_layout")]
    pub layout: String,
    /// Graph input to feed; the session's first input when unset
    #[serde(default)]
    pub input_name: Option<String>,
    #[serde(default = "d_intra_threads")]
    pub intra_threads: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: defaults::model_path().into(),
            input_width: defaults::input_width(),
            input_height: defaults::input_height(),
            layout: defaults::layout().into(),
            input_name: None,
            intra_threads: defaults::intra_threads(),
        }
    }
}
