//! In-process store used for local development and tests.

use crate::store::types::{StoreError, StudentStore, generate_student_id, parse_student_id};
use crate::student::{NewStudent, Student, StudentPatch};
use async_trait::async_trait;
use tokio::sync::RwLock;

/// Keeps students in insertion order. Contents are lost when the process exits.
#[derive(Default)]
pub struct MemoryStore {
    students: RwLock<Vec<Student>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StudentStore for MemoryStore {
    async fn create(&self, student: NewStudent) -> Result<Student, StoreError> {
        let student = student.into_student(generate_student_id());
        self.students.write().await.push(student.clone());
        tracing::debug!(student_id = %student.id, "Student stored in memory");
        Ok(student)
    }

    async fn find_all(&self) -> Result<Vec<Student>, StoreError> {
        Ok(self.students.read().await.clone())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Student>, StoreError> {
        let id = parse_student_id(id)?;
        let students = self.students.read().await;
        Ok(students.iter().find(|student| student.id == id).cloned())
    }

    async fn update_by_id(
        &self,
        id: &str,
        patch: StudentPatch,
    ) -> Result<Option<Student>, StoreError> {
        let id = parse_student_id(id)?;
        let mut students = self.students.write().await;
        let Some(student) = students.iter_mut().find(|student| student.id == id) else {
            return Ok(None);
        };
        patch.apply(student);
        Ok(Some(student.clone()))
    }

    async fn delete_by_id(&self, id: &str) -> Result<Option<Student>, StoreError> {
        let id = parse_student_id(id)?;
        let mut students = self.students.write().await;
        let position = students.iter().position(|student| student.id == id);
        Ok(position.map(|index| students.remove(index)))
    }
}
