//! Shared types used by the store implementations.

use crate::student::{NewStudent, Student, StudentPatch};
use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;
use uuid::Uuid;

/// Errors returned while interacting with the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid store URL: {0}")]
    InvalidUrl(String),
    /// Identifier is not a well-formed student id.
    #[error("Invalid student id: {0}")]
    InvalidId(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The store responded with an unexpected status code.
    #[error("Unexpected store response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the store.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// A stored document could not be decoded into a student.
    #[error("Malformed student document: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Single-document operations over the student collection.
///
/// `Ok(None)` from the id-keyed operations means no document matched.
#[async_trait]
pub trait StudentStore: Send + Sync {
    /// Insert a new document and return it with its assigned id.
    async fn create(&self, student: NewStudent) -> Result<Student, StoreError>;

    /// Every stored document, in the store's natural order.
    async fn find_all(&self) -> Result<Vec<Student>, StoreError>;

    /// Exact-match lookup by id.
    async fn find_by_id(&self, id: &str) -> Result<Option<Student>, StoreError>;

    /// Apply a partial update and return the post-update document.
    async fn update_by_id(
        &self,
        id: &str,
        patch: StudentPatch,
    ) -> Result<Option<Student>, StoreError>;

    /// Remove a document and return its last stored state.
    async fn delete_by_id(&self, id: &str) -> Result<Option<Student>, StoreError>;
}

/// Generate a fresh student id: a UUIDv4 rendered as 32 lowercase hex digits.
pub fn generate_student_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Validate a client supplied id and return its canonical form.
pub fn parse_student_id(id: &str) -> Result<String, StoreError> {
    Uuid::try_parse(id)
        .map(|uuid| uuid.simple().to_string())
        .map_err(|_| StoreError::InvalidId(id.to_string()))
}
