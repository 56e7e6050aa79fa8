//! Multipart upload validation and per-request staging

use axum::body::Bytes;
use axum::extract::multipart::{Multipart, MultipartError};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use thiserror::Error;
use uuid::Uuid;

/// Multipart field carrying the image
pub const IMAGE_FIELD: &str = "image";

/// Accepted file extensions (case-insensitive)
pub const ALLOWED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];

/// Upload rejected before it reaches the inference pipeline
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("No image file provided")]
    MissingFile,

    #[error("No file selected")]
    EmptyFilename,

    #[error("Invalid file type. Allowed: png, jpg, jpeg, gif")]
    DisallowedExtension,

    #[error("Failed to read upload: {0}")]
    Multipart(#[from] MultipartError),

    #[error("Failed to stage upload: {0}")]
    Staging(#[from] std::io::Error),
}

/// Lower-cased extension of `filename` when it is an accepted image type
pub fn allowed_extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// Image file received from a client
#[derive(Debug)]
pub struct UploadedImage {
    pub filename: String,
    pub extension: String,
    pub bytes: Bytes,
}

/// Pull the `image` field out of a multipart body and validate its filename
pub async fn read_image_field(multipart: &mut Multipart) -> Result<UploadedImage, UploadError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        if filename.is_empty() {
            return Err(UploadError::EmptyFilename);
        }

        let extension = allowed_extension(&filename).ok_or(UploadError::DisallowedExtension)?;
        let bytes = field.bytes().await?;

        return Ok(UploadedImage {
            filename,
            extension,
            bytes,
        });
    }

    Err(UploadError::MissingFile)
}

/// Upload written to the staging directory.
///
/// The file is removed when the value is dropped, on every exit path.
#[derive(Debug)]
pub struct StagedImage {
    file: NamedTempFile,
}

impl StagedImage {
    /// Write `upload` into `dir` under a request-unique name
    pub fn stage(dir: &Path, request_id: Uuid, upload: &UploadedImage) -> Result<Self, UploadError> {
        let prefix = format!("{}_", request_id);
        let suffix = format!(".{}", upload.extension);

        let mut file = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(&suffix)
            .tempfile_in(dir)?;
        file.write_all(&upload.bytes)?;
        file.flush()?;

        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}
