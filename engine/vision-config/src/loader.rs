//! Configuration loading logic.
//!
//! Handles loading config from files and applying environment variable overrides.

use crate::CentralConfig;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Standard locations to search for config.toml
pub const CONFIG_SEARCH_PATHS: &[&str] = &[
    "config.toml",      // Current directory
    "../config.toml",   // Parent directory (when running from web/)
    "/app/config.toml", // Docker container
];

/// Load the central configuration from config.toml.
///
/// Searches for config.toml in the following order:
/// 1. Path specified by VISION_CONFIG environment variable
/// 2. Current directory (config.toml)
/// 3. Parent directory (../config.toml)
/// 4. Docker container path (/app/config.toml)
///
/// After loading, environment variable overrides are applied.
pub fn load_config() -> CentralConfig {
    if let Ok(path) = std::env::var("VISION_CONFIG") {
        let path = PathBuf::from(&path);
        if path.exists() {
            info!("Loading config from VISION_CONFIG: {}", path.display());
            return load_from_path(&path);
        }
        warn!(
            "VISION_CONFIG={} not found, searching defaults",
            path.display()
        );
    }

    for path_str in CONFIG_SEARCH_PATHS {
        let path = PathBuf::from(path_str);
        if path.exists() {
            info!("Loading config from {}", path.display());
            return load_from_path(&path);
        }
    }

    debug!("No config.toml found, using built-in defaults");
    apply_env_overrides(CentralConfig::default())
}

/// Load configuration from a specific path.
pub fn load_from_path(path: &Path) -> CentralConfig {
    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => apply_env_overrides(config),
            Err(e) => {
                warn!("Failed to parse {}: {}, using defaults", path.display(), e);
                apply_env_overrides(CentralConfig::default())
            }
        },
        Err(e) => {
            warn!("Failed to read {}: {}, using defaults", path.display(), e);
            apply_env_overrides(CentralConfig::default())
        }
    }
}

/// Macro to reduce env override boilerplate
macro_rules! env_override {
    // String field
    ($config:expr, $section:ident . $field:ident, $key:expr) => {
        if let Ok(v) = std::env::var($key) {
            $config.$section.$field = v;
        }
    };
    // Parseable field (u16, usize, etc.)
    ($config:expr, $section:ident . $field:ident, $key:expr, parse) => {
        if let Ok(v) =
            std::env::var($key).and_then(|s| s.parse().map_err(|_| std::env::VarError::NotPresent))
        {
            $config.$section.$field = v;
        }
    };
    // Optional string field
    ($config:expr, $section:ident . $field:ident, $key:expr, optional) => {
        if let Ok(v) = std::env::var($key) {
            $config.$section.$field = Some(v);
        }
    };
    // Comma-separated list field
    ($config:expr, $section:ident . $field:ident, $key:expr, list) => {
        if let Ok(v) = std::env::var($key) {
            $config.$section.$field = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
    };
}

/// Apply environment variable overrides to a configuration.
///
/// Environment variables follow the pattern: VISION_<SECTION>_<KEY>
pub fn apply_env_overrides(mut config: CentralConfig) -> CentralConfig {
    // Common
    env_override!(config, common.log_level, "VISION_COMMON_LOG_LEVEL");

    // Web
    env_override!(config, web.host, "VISION_WEB_HOST");
    env_override!(config, web.port, "VISION_WEB_PORT", parse);

    // Upload
    env_override!(config, upload.dir, "VISION_UPLOAD_DIR");
    env_override!(config, upload.form_field, "VISION_UPLOAD_FORM_FIELD");
    env_override!(
        config,
        upload.allowed_extensions,
        "VISION_UPLOAD_ALLOWED_EXTENSIONS",
        list
    );
    env_override!(config, upload.max_bytes, "VISION_UPLOAD_MAX_BYTES", parse);

    // Model
    env_override!(config, model.path, "VISION_MODEL_PATH");
    env_override!(config, model.input_width, "VISION_MODEL_INPUT_WIDTH", parse);
    env_override!(
        config,
        model.input_height,
        "VISION_MODEL_INPUT_HEIGHT",
        parse
    );
    env_override!(config, model.layout, "VISION_MODEL_LAYOUT");
    env_override!(config, model.input_name, "VISION_MODEL_INPUT_NAME", optional);
    env_override!(
        config,
        model.intra_threads,
        "VISION_MODEL_INTRA_THREADS",
        parse
    );

    config
}
