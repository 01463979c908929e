//! Upload validation and temporary storage.
//!
//! Uploads are trusted by extension only: the extension must match one of
//! the configured entries exactly (case-sensitive, dot included). Accepted
//! uploads are written to `<dir>/<uuid><ext>` and owned by a [`TempUpload`]
//! guard that deletes the file when dropped.

use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;
use vision_config::UploadConfig;

use crate::prediction::PredictError;

/// Upload settings resolved from configuration.
#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub dir: PathBuf,
    pub form_field: String,
    pub allowed_extensions: Vec<String>,
    pub max_bytes: usize,
}

impl From<&UploadConfig> for UploadSettings {
    fn from(config: &UploadConfig) -> Self {
        Self {
            dir: PathBuf::from(&config.dir),
            form_field: config.form_field.clone(),
            allowed_extensions: config.allowed_extensions.clone(),
            max_bytes: config.max_bytes,
        }
    }
}

impl UploadSettings {
    /// Create the upload directory if it does not exist yet.
    pub fn prepare_dir(&self) -> io::Result<()> {
        if !self.dir.is_dir() {
            fs::create_dir_all(&self.dir)?;
            debug!("Created upload directory {}", self.dir.display());
        }
        Ok(())
    }

    /// Return the extension of `file_name` if it is in the allowed list.
    pub fn validate_extension(&self, file_name: &str) -> Result<String, PredictError> {
        let extension = split_extension(file_name);
        if self.allowed_extensions.iter().any(|allowed| allowed == extension) {
            Ok(extension.to_string())
        } else {
            Err(PredictError::InvalidExtension {
                got: extension.to_string(),
                allowed: self.allowed_extensions.join(", "),
            })
        }
    }
}

/// Split off the extension of the last path component, dot included.
///
/// Leading dots of the component do not start an extension, so `.bashrc`
/// has none and `archive.tar.gz` yields `.gz`.
pub fn split_extension(file_name: &str) -> &str {
    let base_start = file_name.rfind('/').map(|i| i + 1).unwrap_or(0);
    let base = &file_name[base_start..];
    match base.rfind('.') {
        Some(dot) if base[..dot].chars().any(|c| c != '.') => &base[dot..],
        _ => "",
    }
}

/// An uploaded file on disk, removed when the guard is dropped.
#[derive(Debug)]
pub struct TempUpload {
    id: Uuid,
    path: PathBuf,
}

impl TempUpload {
    /// Write `bytes` to `<dir>/<uuid><extension>`.
    pub fn persist(dir: &Path, extension: &str, bytes: &[u8]) -> io::Result<Self> {
        let id = Uuid::new_v4();
        let path = dir.join(format!("{}{}", id, extension));
        if let Err(e) = fs::write(&path, bytes) {
            let _ = fs::remove_file(&path);
            return Err(e);
        }
        debug!(upload_id = %id, path = %path.display(), "Stored upload");
        Ok(Self { id, path })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Point the guard at a new file, returning the previous path.
    /// The caller is responsible for the returned file.
    pub(crate) fn replace_path(&mut self, path: PathBuf) -> PathBuf {
        std::mem::replace(&mut self.path, path)
    }
}

impl Drop for TempUpload {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(upload_id = %self.id, "Removed upload"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(
                upload_id = %self.id,
                "Failed to remove upload {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}
