//! Default configuration values loaded from config.defaults.toml.
//!
//! The defaults file is embedded at compile time so the binary carries the
//! same values the repository documents.

use once_cell::sync::Lazy;
use serde::Deserialize;

/// The embedded defaults TOML file (loaded at compile time)
const DEFAULTS_TOML: &str = include_str!("../../../config.defaults.toml");

/// Parsed defaults structure (parsed once at first use)
static DEFAULTS: Lazy<DefaultsConfig> = Lazy::new(|| {
    toml::from_str(DEFAULTS_TOML).expect("config.defaults.toml should be valid TOML")
});

// ============================================================================
// Internal structs for parsing config.defaults.toml
// ============================================================================

#[derive(Debug, Deserialize)]
struct DefaultsConfig {
    common: CommonDefaults,
    web: WebDefaults,
    upload: UploadDefaults,
    model: ModelDefaults,
}

#[derive(Debug, Deserialize)]
struct CommonDefaults {
    log_level: String,
}

#[derive(Debug, Deserialize)]
struct WebDefaults {
    host: String,
    port: u16,
}

#[derive(Debug, Deserialize)]
struct UploadDefaults {
    dir: String,
    form_field: String,
    allowed_extensions: Vec<String>,
    max_bytes: usize,
}

#[derive(Debug, Deserialize)]
struct ModelDefaults {
    path: String,
    input_width: u32,
    input_height: u32,
    layout: String,
    intra_threads: usize,
}

// ============================================================================
// Public accessor functions
// ============================================================================

// Common
pub fn log_level() -> &'static str {
    &DEFAULTS.common.log_level
}

// Web
pub fn host() -> &'static str {
    &DEFAULTS.web.host
}
pub fn port() -> u16 {
    DEFAULTS.web.port
}

// Upload
pub fn upload_dir() -> &'static str {
    &DEFAULTS.upload.dir
}
pub fn form_field() -> &'static str {
    &DEFAULTS.upload.form_field
}
pub fn allowed_extensions() -> &'static [String] {
    &DEFAULTS.upload.allowed_extensions
}
pub fn max_bytes() -> usize {
    DEFAULTS.upload.max_bytes
}

// Model
pub fn model_path() -> &'static str {
    &DEFAULTS.model.path
}
pub fn input_width() -> u32 {
    DEFAULTS.model.input_width
}
pub fn input_height() -> u32 {
    DEFAULTS.model.input_height
}
pub fn layout() -> &'static str {
    &DEFAULTS.model.layout
}
pub fn intra_threads() -> usize {
    DEFAULTS.model.intra_threads
}
