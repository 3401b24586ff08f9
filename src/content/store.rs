/// Content store for image binaries
///
/// Imported and replaced image files live in a single content directory.
/// Content files are versioned: every write gets a fresh name, so a path
/// uniquely identifies one revision of one image's content.

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::Utc;
use thiserror::Error;

use crate::state::data::ImageDescriptor;

/// File extensions accepted by the folder import and the replacement picker
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "webp", "bmp", "tif", "tiff", "ico",
];

/// Errors from content-store operations
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("file is not a supported image format")]
    UnsupportedFormat,
    #[error("content file not found: {0}")]
    NotFound(String),
}

/// Get the default content store directory
/// Returns ~/.local/share/image-vault/content on Linux
pub fn default_content_dir() -> PathBuf {
    let mut path = dirs::data_dir()
        .or_else(dirs::home_dir)
        .expect("Could not determine user data directory");

    path.push("image-vault");
    path.push("content");
    path
}

/// Probe an image file: sniffed media type plus media descriptor.
/// Rejects files whose content is not a supported image format.
pub fn probe_image(path: &Path) -> Result<(String, ImageDescriptor), ContentError> {
    let metadata = fs::metadata(path)?;

    // The magic bytes live in the first few dozen bytes of the file
    let mut header = [0u8; 64];
    let read = File::open(path)?.read(&mut header)?;
    let format =
        image::guess_format(&header[..read]).map_err(|_| ContentError::UnsupportedFormat)?;

    let (width, height) =
        image::image_dimensions(path).map_err(|_| ContentError::UnsupportedFormat)?;

    let descriptor = ImageDescriptor {
        width,
        height,
        size_bytes: metadata.len(),
    };

    Ok((format.to_mime_type().to_string(), descriptor))
}

/// Copy a source file into the content store under a versioned name.
/// Returns the path of the new content file.
pub fn store_content(content_dir: &Path, key: &str, source: &Path) -> Result<PathBuf, ContentError> {
    fs::create_dir_all(content_dir)?;

    let extension = source
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_else(|| "img".to_string());

    // Key + millisecond stamp keeps successive replacements distinct
    let stamp = Utc::now().timestamp_millis();
    let mut dest = content_dir.join(format!("{}-{}.{}", key, stamp, extension));
    let mut attempt = 1;
    while dest.exists() {
        dest = content_dir.join(format!("{}-{}-{}.{}", key, stamp, attempt, extension));
        attempt += 1;
    }

    fs::copy(source, &dest)?;

    Ok(dest)
}

/// Copy a content file out of the store to a user-chosen destination.
/// Returns the number of bytes written.
pub fn export_content(content_path: &str, dest: &Path) -> Result<u64, ContentError> {
    let source = Path::new(content_path);
    if !source.exists() {
        return Err(ContentError::NotFound(content_path.to_string()));
    }

    Ok(fs::copy(source, dest)?)
}

/// Remove a stale content or thumbnail file.
/// A file that is already gone is not an error.
pub fn remove_content(path: &str) {
    let _ = fs::remove_file(path);
}
