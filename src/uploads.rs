//! Local blob storage for uploaded student images.
//!
//! Files are written under `<unix millis><original extension>`. Two uploads carrying the
//! same extension within the same millisecond share a name and the later one wins.

use axum::body::Bytes;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use time::OffsetDateTime;

/// Errors raised while writing or removing uploaded files.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The upload directory could not be created.
    #[error("Failed to prepare upload directory {path}: {source}")]
    Prepare {
        /// Directory we attempted to create.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Writing the uploaded bytes failed.
    #[error("Failed to write upload {path}: {source}")]
    Write {
        /// Destination file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Removing a previously written upload failed.
    #[error("Failed to remove upload {path}: {source}")]
    Remove {
        /// File we attempted to delete.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// An image file received with a create or update request.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    /// File name as sent by the client; only its extension is kept.
    pub file_name: String,
    /// Raw file contents.
    pub bytes: Bytes,
}

/// Directory-backed image storage.
#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    /// Open (and create if needed) the upload directory.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, UploadError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|source| UploadError::Prepare {
                path: root.clone(),
                source,
            })?;
        tracing::debug!(upload_dir = %root.display(), "Upload directory ready");
        Ok(Self { root })
    }

    #[cfg(test)]
    fn root(&self) -> &Path {
        &self.root
    }

    /// Write an upload and return the path to record on the student.
    pub async fn save(&self, upload: &ImageUpload) -> Result<String, UploadError> {
        let path = self.root.join(stored_file_name(
            &upload.file_name,
            OffsetDateTime::now_utc(),
        ));
        tokio::fs::write(&path, &upload.bytes)
            .await
            .map_err(|source| UploadError::Write {
                path: path.clone(),
                source,
            })?;
        let recorded = path.to_string_lossy().into_owned();
        tracing::debug!(
            image_path = %recorded,
            bytes = upload.bytes.len(),
            "Stored uploaded image"
        );
        Ok(recorded)
    }

    /// Delete a file previously returned by [`ImageStore::save`].
    pub async fn remove(&self, recorded_path: &str) -> Result<(), UploadError> {
        tokio::fs::remove_file(recorded_path)
            .await
            .map_err(|source| UploadError::Remove {
                path: PathBuf::from(recorded_path),
                source,
            })
    }
}

/// Millisecond timestamp followed by the original extension (including its dot).
pub fn stored_file_name(original: &str, now: OffsetDateTime) -> String {
    let millis = now.unix_timestamp_nanos() / 1_000_000;
    match Path::new(original)
        .extension()
        .and_then(|extension| extension.to_str())
    {
        Some(extension) => format!("{millis}.{extension}"),
        None => millis.to_string(),
    }
}
