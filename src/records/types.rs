//! Error taxonomy shared by every record operation.

use crate::{store::StoreError, student::ValidationError, uploads::UploadError};
use thiserror::Error;

/// Errors emitted by the record service.
#[derive(Debug, Error)]
pub enum StudentError {
    /// Client input failed the presence or type checks.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// No student exists for the requested id.
    #[error("Student not found")]
    NotFound,
    /// The document store failed, including on malformed ids.
    #[error("Store request failed: {0}")]
    Store(#[from] StoreError),
    /// Writing the uploaded image failed.
    #[error("Image upload failed: {0}")]
    Upload(#[from] UploadError),
}
