//! Centralized configuration loading from config.toml.
//!
//! This crate provides the configuration structs and loading logic used by
//! the web service.
//!
//! # Configuration Priority
//!
//! Settings are loaded with the following priority (highest to lowest):
//! 1. Environment variables (`VISION_<SECTION>_<KEY>`)
//! 2. config.toml file
//! 3. Built-in defaults (config.defaults.toml, embedded at compile time)
//!
//! # Environment Variable Override Pattern
//!
//! ```text
//! VISION_<SECTION>_<KEY>=value
//!
//! Examples:
//!     VISION_WEB_PORT=8080
//!     VISION_UPLOAD_DIR=/tmp/uploads
//!     VISION_UPLOAD_FORM_FIELD=value
//!     VISION_UPLOAD_ALLOWED_EXTENSIONS=.png,.jpg
//!     VISION_MODEL_PATH=/models/classifier.onnx
//! ```

mod defaults;
mod loader;
mod structs;

pub use defaults::*;
pub use loader::{apply_env_overrides, load_config, load_from_path, CONFIG_SEARCH_PATHS};
pub use structs::*;
