//! Menu image storage on the local filesystem.
//!
//! DESIGN
//! ======
//! Uploads are decoded, shrunk to fit 800×600 (aspect ratio kept, never
//! upscaled), and re-encoded as JPEG quality 85. Files are named by the
//! SHA-256 of the encoded bytes under the owner's directory
//! (`<owner_id>/<sha256>.jpg`), so re-uploading the same picture reuses the
//! file. The upload directory is served publicly under `/uploads`.
//!
//! Decoding and resizing are CPU-bound and run on the blocking pool.

use std::io::Cursor;
use std::path::{Component, Path, PathBuf};

use image::imageops::FilterType;
use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::frame::ErrorCode;

/// Maximum upload size (5MB).
pub const MAX_FILE_SIZE: usize = 5 * 1024 * 1024;

/// Accepted upload extensions.
pub const SUPPORTED_FORMATS: &[&str] = &["png", "jpg", "jpeg", "webp"];

const MAX_WIDTH: u32 = 800;
const MAX_HEIGHT: u32 = 600;
const JPEG_QUALITY: u8 = 85;

/// Largest source dimension accepted for decoding.
const MAX_DECODE_DIMENSION: u32 = 8192;
/// Decoder allocation ceiling.
const MAX_DECODE_ALLOC: u64 = 128 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("file too large: {0} bytes (max {MAX_FILE_SIZE})")]
    TooLarge(usize),
    #[error("empty file")]
    Empty,
    #[error("unsupported file format '{0}'")]
    UnsupportedFormat(String),
    #[error("invalid image: {0}")]
    InvalidImage(String),
    #[error("image processing failed: {0}")]
    Processing(String),
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ErrorCode for StorageError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::TooLarge(_) => "E_IMAGE_TOO_LARGE",
            Self::Empty => "E_IMAGE_EMPTY",
            Self::UnsupportedFormat(_) => "E_IMAGE_FORMAT",
            Self::InvalidImage(_) => "E_IMAGE_INVALID",
            Self::Processing(_) => "E_IMAGE_PROCESSING",
            Self::Io(_) => "E_STORAGE_IO",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

/// A stored image.
#[derive(Debug, Clone, Serialize)]
pub struct StoredImage {
    pub url: String,
    /// Path relative to the upload root.
    pub key: String,
    pub width: u32,
    pub height: u32,
    pub size: usize,
}

/// Output of [`compress_image`].
#[derive(Debug)]
pub struct CompressedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
    base_url: String,
}

impl ImageStore {
    /// `base_url` is the public prefix the root is served under, without a
    /// trailing slash.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self { root: root.into(), base_url: base_url.into().trim_end_matches('/').to_owned() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validate, compress, and store a menu image for `owner_id`.
    ///
    /// # Errors
    ///
    /// Validation errors for empty, oversized, unsupported, or undecodable
    /// uploads; `Io` when the file cannot be written.
    pub async fn store_menu_image(&self, owner_id: Uuid, data: Vec<u8>, filename: &str) -> Result<StoredImage, StorageError> {
        validate_upload(&data, filename)?;

        let compressed = tokio::task::spawn_blocking(move || compress_image(&data))
            .await
            .map_err(|e| StorageError::Processing(e.to_string()))??;

        let hash = hex::encode(Sha256::digest(&compressed.bytes));
        let key = format!("{owner_id}/{hash}.jpg");
        let path = self.root.join(owner_id.to_string()).join(format!("{hash}.jpg"));

        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(&path, &compressed.bytes).await?;

        tracing::info!(%owner_id, %key, size = compressed.bytes.len(), "image stored");
        Ok(StoredImage {
            url: format!("{}/{key}", self.base_url),
            key,
            width: compressed.width,
            height: compressed.height,
            size: compressed.bytes.len(),
        })
    }

    /// Whether `url` names a file this store issued for `owner_id`.
    #[must_use]
    pub fn is_owner_url(&self, owner_id: Uuid, url: &str) -> bool {
        self.path_for_url(owner_id, url).is_some()
    }

    /// Delete an image previously stored for `owner_id`. URLs this store
    /// did not issue, or issued for another owner, are ignored. Returns
    /// whether a file was removed.
    ///
    /// # Errors
    ///
    /// `Io` for failures other than the file already being gone.
    pub async fn delete_by_url(&self, owner_id: Uuid, url: &str) -> Result<bool, StorageError> {
        let Some(path) = self.path_for_url(owner_id, url) else {
            return Ok(false);
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(%owner_id, path = %path.display(), "image deleted");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Map a public URL back to a path inside the owner's directory,
    /// refusing anything that would escape it.
    fn path_for_url(&self, owner_id: Uuid, url: &str) -> Option<PathBuf> {
        let key = url.strip_prefix(&self.base_url)?.strip_prefix('/')?;
        let name = key.strip_prefix(&owner_id.to_string())?.strip_prefix('/')?;
        let relative = Path::new(key);
        if name.is_empty() || !relative.components().all(|c| matches!(c, Component::Normal(_))) {
            return None;
        }
        Some(self.root.join(relative))
    }
}

/// Reject uploads that are empty, too big, or not a supported extension.
///
/// # Errors
///
/// The matching [`StorageError`] variant.
pub fn validate_upload(data: &[u8], filename: &str) -> Result<(), StorageError> {
    if data.is_empty() {
        return Err(StorageError::Empty);
    }
    if data.len() > MAX_FILE_SIZE {
        return Err(StorageError::TooLarge(data.len()));
    }
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if !SUPPORTED_FORMATS.contains(&ext.as_str()) {
        return Err(StorageError::UnsupportedFormat(ext));
    }
    Ok(())
}

/// Decode (within size limits), shrink to fit 800×600, and encode as JPEG.
///
/// # Errors
///
/// `InvalidImage` when the bytes do not decode; `Processing` when encoding
/// fails.
pub fn compress_image(data: &[u8]) -> Result<CompressedImage, StorageError> {
    let mut limits = image::Limits::default();
    limits.max_image_width = Some(MAX_DECODE_DIMENSION);
    limits.max_image_height = Some(MAX_DECODE_DIMENSION);
    limits.max_alloc = Some(MAX_DECODE_ALLOC);

    let mut reader = image::ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| StorageError::InvalidImage(e.to_string()))?;
    reader.limits(limits);
    let img = reader.decode().map_err(|e| StorageError::InvalidImage(e.to_string()))?;

    let img = if img.width() > MAX_WIDTH || img.height() > MAX_HEIGHT {
        img.resize(MAX_WIDTH, MAX_HEIGHT, FilterType::Triangle)
    } else {
        img
    };

    let rgb = img.to_rgb8();
    let mut bytes = Vec::new();
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(Cursor::new(&mut bytes), JPEG_QUALITY);
    rgb.write_with_encoder(encoder)
        .map_err(|e| StorageError::Processing(e.to_string()))?;

    Ok(CompressedImage { bytes, width: rgb.width(), height: rgb.height() })
}

#[cfg(test)]
#[path = "storage_test.rs"]
mod tests;
