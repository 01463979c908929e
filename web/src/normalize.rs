//! GIF → PNG normalization.
//!
//! GIF uploads are re-encoded as PNG next to the original before inference
//! and the original is removed. Only the first frame survives.

use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::PathBuf;

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ImageError, ImageReader};
use tracing::debug;

use crate::upload::TempUpload;

pub const GIF_EXTENSION: &str = ".gif";

/// Rewrite a stored GIF upload as `<uuid>.png` and delete the GIF.
///
/// On success the guard owns the PNG. On failure the guard still owns the
/// original GIF and no PNG is left behind.
pub fn rewrite_gif_to_png(upload: &mut TempUpload) -> Result<(), ImageError> {
    let png_path = upload.path().with_extension("png");

    let image = ImageReader::open(upload.path())?
        .with_guessed_format()?
        .decode()?;

    let written = File::create(&png_path)
        .map_err(ImageError::from)
        .and_then(|file| {
            let encoder = PngEncoder::new_with_quality(
                BufWriter::new(file),
                CompressionType::Best,
                FilterType::Adaptive,
            );
            image.write_with_encoder(encoder)
        });
    if let Err(e) = written {
        let _ = fs::remove_file(&png_path);
        return Err(e);
    }

    adopt_converted(upload, png_path)?;
    debug!(upload_id = %upload.id(), "Converted GIF upload to PNG");
    Ok(())
}

/// Remove the original and hand the converted file to the guard.
///
/// If the original cannot be removed, the converted file is deleted instead
/// and the guard keeps the original, so at most one file is ever pending.
fn adopt_converted(upload: &mut TempUpload, converted: PathBuf) -> io::Result<()> {
    if let Err(e) = fs::remove_file(upload.path()) {
        let _ = fs::remove_file(&converted);
        return Err(e);
    }
    upload.replace_path(converted);
    Ok(())
}
