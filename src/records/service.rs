//! Record service coordinating blob storage and the document store.

use crate::{
    config::{Config, StoreBackend},
    records::types::StudentError,
    store::{CouchDbStore, MemoryStore, StudentStore, parse_student_id},
    student::{NewStudent, Student, StudentFields, StudentPatch},
    uploads::{ImageStore, ImageUpload},
};
use async_trait::async_trait;
use std::sync::Arc;

/// Owns the store handle and the image directory for the lifetime of the process.
///
/// Create and update are two-phase: the image (if any) is written first, then the record.
/// When the record write fails, or the update target does not exist, the freshly written
/// image is removed again so no orphan is left on disk.
pub struct StudentService {
    store: Arc<dyn StudentStore>,
    images: ImageStore,
}

/// Abstraction over the record operations used by the HTTP surface.
#[async_trait]
pub trait StudentApi: Send + Sync {
    /// Validate and persist a new student, storing its image first when one is attached.
    async fn create(
        &self,
        fields: StudentFields,
        image: Option<ImageUpload>,
    ) -> Result<Student, StudentError>;

    /// Every stored student.
    async fn list(&self) -> Result<Vec<Student>, StudentError>;

    /// One student by id.
    async fn get(&self, id: &str) -> Result<Student, StudentError>;

    /// Partially update a student; omitted fields keep their stored values.
    async fn update(
        &self,
        id: &str,
        fields: StudentFields,
        image: Option<ImageUpload>,
    ) -> Result<Student, StudentError>;

    /// Remove a student and return its last stored state.
    async fn delete(&self, id: &str) -> Result<Student, StudentError>;
}

impl StudentService {
    /// Compose a service from an explicit store handle and image directory.
    pub fn new(store: Arc<dyn StudentStore>, images: ImageStore) -> Self {
        Self { store, images }
    }

    /// Build the configured store and open the upload directory.
    pub async fn from_config(config: &Config) -> Result<Self, StudentError> {
        let store: Arc<dyn StudentStore> = match config.store_backend {
            StoreBackend::CouchDb => {
                let couch = CouchDbStore::new(config)?;
                couch.ensure_database().await?;
                Arc::new(couch)
            }
            StoreBackend::Memory => {
                tracing::warn!("Using the in-memory store; records are lost on restart");
                Arc::new(MemoryStore::new())
            }
        };
        let images = ImageStore::open(&config.upload_dir).await?;
        tracing::info!(backend = ?config.store_backend, "Student service ready");
        Ok(Self::new(store, images))
    }

    async fn store_image(&self, image: Option<ImageUpload>) -> Result<Option<String>, StudentError> {
        match image {
            Some(upload) => Ok(Some(self.images.save(&upload).await?)),
            None => Ok(None),
        }
    }

    async fn discard_image(&self, image_path: Option<&str>) {
        let Some(path) = image_path else {
            return;
        };
        match self.images.remove(path).await {
            Ok(()) => tracing::debug!(image_path = path, "Removed orphaned image"),
            Err(error) => {
                tracing::warn!(image_path = path, error = %error, "Failed to remove orphaned image")
            }
        }
    }
}

#[async_trait]
impl StudentApi for StudentService {
    async fn create(
        &self,
        fields: StudentFields,
        image: Option<ImageUpload>,
    ) -> Result<Student, StudentError> {
        let new_student = NewStudent::try_from_fields(fields)?;
        let image_path = self.store_image(image).await?;

        match self
            .store
            .create(new_student.with_image_path(image_path.clone()))
            .await
        {
            Ok(student) => {
                tracing::info!(
                    student_id = %student.id,
                    has_image = student.image_path.is_some(),
                    "Student created"
                );
                Ok(student)
            }
            Err(error) => {
                self.discard_image(image_path.as_deref()).await;
                Err(error.into())
            }
        }
    }

    async fn list(&self) -> Result<Vec<Student>, StudentError> {
        let students = self.store.find_all().await?;
        tracing::debug!(count = students.len(), "Listed students");
        Ok(students)
    }

    async fn get(&self, id: &str) -> Result<Student, StudentError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or(StudentError::NotFound)
    }

    async fn update(
        &self,
        id: &str,
        fields: StudentFields,
        image: Option<ImageUpload>,
    ) -> Result<Student, StudentError> {
        // Reject malformed ids before anything touches the disk.
        parse_student_id(id)?;
        let image_path = self.store_image(image).await?;
        let patch = StudentPatch::new(fields, image_path.clone());

        match self.store.update_by_id(id, patch).await {
            Ok(Some(student)) => {
                tracing::info!(student_id = %student.id, "Student updated");
                Ok(student)
            }
            Ok(None) => {
                self.discard_image(image_path.as_deref()).await;
                Err(StudentError::NotFound)
            }
            Err(error) => {
                self.discard_image(image_path.as_deref()).await;
                Err(error.into())
            }
        }
    }

    async fn delete(&self, id: &str) -> Result<Student, StudentError> {
        let student = self
            .store
            .delete_by_id(id)
            .await?
            .ok_or(StudentError::NotFound)?;
        tracing::info!(student_id = %student.id, "Student deleted");
        Ok(student)
    }
}
