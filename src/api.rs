//! HTTP surface for the student records service.
//!
//! - `POST /students` – Create a student from `FullName`, `age`, `grade` and an optional
//!   `image` file. Returns `201 { message, Student }`.
//! - `GET /students` – List every stored student.
//! - `GET /student/:id` (also `GET /students/:id`) – Fetch one student.
//! - `PUT /students/:id` – Partially update a student; an attached `image` replaces the stored
//!   path. Returns `{ message, student }`.
//! - `DELETE /students/:id` – Delete a student and return its last stored state.
//!
//! Every failure is translated by [`status_for`], so the same error always produces the same
//! status no matter which route raised it.

pub mod submission;

use crate::records::{StudentApi, StudentError};
use crate::student::Student;
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use std::sync::Arc;
use crate::store::parse_student_id;
use submission::{StudentSubmission, SubmissionRejection};
use tower_http::trace::TraceLayer;

/// Build the HTTP router over an explicitly constructed record service.
pub fn create_router<S>(service: Arc<S>, max_upload_bytes: usize) -> Router
where
    S: StudentApi + 'static,
{
    Router::new()
        .route(
            "/students",
            get(list_students::<S>).post(create_student::<S>),
        )
        .route("/student/:id", get(get_student::<S>))
        .route(
            "/students/:id",
            get(get_student::<S>)
                .put(update_student::<S>)
                .delete(delete_student::<S>),
        )
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

/// Which operation produced an error; selects the failure message sent to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// `POST /students`
    Create,
    /// `GET /students`
    List,
    /// `GET /student/:id`
    Get,
    /// `PUT /students/:id`
    Update,
    /// `DELETE /students/:id`
    Delete,
}

impl Operation {
    fn failure_message(self) -> &'static str {
        match self {
            Self::Create => "Error creating student",
            Self::List => "Error retrieving students",
            Self::Get => "Error retrieving student's Id",
            Self::Update => "Error updating student",
            Self::Delete => "Error deleting student",
        }
    }
}

/// Map a record error onto its HTTP status.
pub fn status_for(error: &StudentError) -> StatusCode {
    match error {
        StudentError::Validation(_) => StatusCode::BAD_REQUEST,
        StudentError::NotFound => StatusCode::NOT_FOUND,
        StudentError::Store(_) | StudentError::Upload(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Response body for `POST /students`.
#[derive(Serialize)]
struct CreatedResponse {
    message: &'static str,
    #[serde(rename = "Student")]
    student: Student,
}

/// Response body for update and delete.
#[derive(Serialize)]
struct StudentResponse {
    message: &'static str,
    student: Student,
}

/// Error body. `error` is only present on server-side failures.
#[derive(Serialize)]
struct ErrorResponse {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Create a student from a multipart, JSON or urlencoded body.
async fn create_student<S>(
    State(service): State<Arc<S>>,
    submission: StudentSubmission,
) -> Result<(StatusCode, Json<CreatedResponse>), AppError>
where
    S: StudentApi,
{
    let StudentSubmission { fields, image } = submission;
    let student = service
        .create(fields, image)
        .await
        .map_err(AppError::during(Operation::Create))?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            message: "Student created successfully",
            student,
        }),
    ))
}

async fn list_students<S>(State(service): State<Arc<S>>) -> Result<Json<Vec<Student>>, AppError>
where
    S: StudentApi,
{
    let students = service
        .list()
        .await
        .map_err(AppError::during(Operation::List))?;
    Ok(Json(students))
}

async fn get_student<S>(
    State(service): State<Arc<S>>,
    Path(id): Path<String>,
) -> Result<Json<Student>, AppError>
where
    S: StudentApi,
{
    let student = service
        .get(&id)
        .await
        .map_err(AppError::during(Operation::Get))?;
    Ok(Json(student))
}

/// Apply a partial update. Fields left out of the body keep their stored values.
///
/// The id is checked before the body is looked at, so a malformed id is a server error even
/// when the body would also be rejected.
async fn update_student<S>(
    State(service): State<Arc<S>>,
    Path(id): Path<String>,
    submission: Result<StudentSubmission, SubmissionRejection>,
) -> Result<Json<StudentResponse>, Response>
where
    S: StudentApi,
{
    let id = parse_student_id(&id)
        .map_err(|err| AppError::during(Operation::Update)(err.into()).into_response())?;
    let StudentSubmission { fields, image } = submission.map_err(IntoResponse::into_response)?;
    let student = service
        .update(&id, fields, image)
        .await
        .map_err(|err| AppError::during(Operation::Update)(err).into_response())?;
    Ok(Json(StudentResponse {
        message: "Student updated successfully",
        student,
    }))
}

async fn delete_student<S>(
    State(service): State<Arc<S>>,
    Path(id): Path<String>,
) -> Result<Json<StudentResponse>, AppError>
where
    S: StudentApi,
{
    let student = service
        .delete(&id)
        .await
        .map_err(AppError::during(Operation::Delete))?;
    Ok(Json(StudentResponse {
        message: "Student deleted successfully",
        student,
    }))
}

/// A record error tagged with the operation that raised it.
#[derive(Debug)]
pub struct AppError {
    operation: Operation,
    source: StudentError,
}

impl AppError {
    /// Adapter for `map_err` that tags errors with `operation`.
    pub fn during(operation: Operation) -> impl FnOnce(StudentError) -> Self {
        move |source| Self { operation, source }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = status_for(&self.source);
        let body = match &self.source {
            StudentError::Validation(error) => ErrorResponse {
                message: error.to_string(),
                error: None,
            },
            StudentError::NotFound => ErrorResponse {
                message: self.source.to_string(),
                error: None,
            },
            StudentError::Store(_) | StudentError::Upload(_) => {
                tracing::error!(
                    operation = ?self.operation,
                    error = %self.source,
                    "Request failed"
                );
                ErrorResponse {
                    message: self.operation.failure_message().to_string(),
                    error: Some(self.source.to_string()),
                }
            }
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::{Operation, create_router, status_for};
    use crate::records::{StudentApi, StudentError};
    use crate::store::StoreError;
    use crate::student::{Student, StudentFields, ValidationError};
    use crate::uploads::{ImageUpload, UploadError};
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode},
    };
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    const ID: &str = "67e5504410b1426f9247bb680e5fe0c8";

    #[derive(Clone, Debug, PartialEq)]
    enum Call {
        Create(StudentFields, Option<String>),
        Get(String),
        Update(String, StudentFields),
        Delete(String),
    }

    #[derive(Clone, Copy)]
    enum Outcome {
        Ok,
        Missing,
        StoreDown,
    }

    struct StubStudentService {
        calls: Mutex<Vec<Call>>,
        outcome: Outcome,
    }

    impl StubStudentService {
        fn new(outcome: Outcome) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                outcome,
            })
        }

        async fn recorded_calls(&self) -> Vec<Call> {
            self.calls.lock().await.clone()
        }

        fn result(&self) -> Result<Student, StudentError> {
            match self.outcome {
                Outcome::Ok => Ok(ada()),
                Outcome::Missing => Err(StudentError::NotFound),
                Outcome::StoreDown => Err(StudentError::Store(StoreError::InvalidUrl(
                    "store offline".into(),
                ))),
            }
        }
    }

    fn ada() -> Student {
        Student {
            id: ID.into(),
            full_name: "Ada".into(),
            age: 30,
            grade: "A".into(),
            image_path: None,
        }
    }

    #[async_trait]
    impl StudentApi for StubStudentService {
        async fn create(
            &self,
            fields: StudentFields,
            image: Option<ImageUpload>,
        ) -> Result<Student, StudentError> {
            self.calls
                .lock()
                .await
                .push(Call::Create(fields.clone(), image.map(|image| image.file_name)));
            if fields.grade.is_none() {
                return Err(ValidationError::MissingFields.into());
            }
            self.result()
        }

        async fn list(&self) -> Result<Vec<Student>, StudentError> {
            self.result().map(|student| vec![student])
        }

        async fn get(&self, id: &str) -> Result<Student, StudentError> {
            self.calls.lock().await.push(Call::Get(id.to_string()));
            self.result()
        }

        async fn update(
            &self,
            id: &str,
            fields: StudentFields,
            _image: Option<ImageUpload>,
        ) -> Result<Student, StudentError> {
            self.calls
                .lock()
                .await
                .push(Call::Update(id.to_string(), fields));
            self.result()
        }

        async fn delete(&self, id: &str) -> Result<Student, StudentError> {
            self.calls.lock().await.push(Call::Delete(id.to_string()));
            self.result()
        }
    }

    async fn send(
        service: Arc<StubStudentService>,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let app = create_router(service, 1024 * 1024);
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = app
            .oneshot(builder.body(body).expect("request"))
            .await
            .expect("router response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json = serde_json::from_slice(&bytes).expect("json body");
        (status, json)
    }

    #[test]
    fn status_mapping_covers_the_taxonomy() {
        assert_eq!(
            status_for(&ValidationError::MissingFields.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_for(&StudentError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(&StoreError::InvalidId("x".into()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        let write_failure = UploadError::Write {
            path: "uploads/1.png".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert_eq!(
            status_for(&write_failure.into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn failure_messages_are_per_operation() {
        assert_eq!(Operation::Get.failure_message(), "Error retrieving student's Id");
        assert_eq!(Operation::List.failure_message(), "Error retrieving students");
    }

    #[tokio::test]
    async fn create_returns_created_envelope() {
        let service = StubStudentService::new(Outcome::Ok);
        let (status, body) = send(
            service.clone(),
            Method::POST,
            "/students",
            Some(json!({"FullName": "Ada", "age": 30, "grade": "A"})),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "Student created successfully");
        assert_eq!(body["Student"]["FullName"], "Ada");
        assert_eq!(body["Student"]["id"], ID);
        assert_eq!(body["Student"]["image"], Value::Null);

        let calls = service.recorded_calls().await;
        assert_eq!(
            calls,
            vec![Call::Create(
                StudentFields {
                    full_name: Some("Ada".into()),
                    age: Some(30),
                    grade: Some("A".into()),
                },
                None
            )]
        );
    }

    #[tokio::test]
    async fn create_with_missing_field_is_bad_request() {
        let service = StubStudentService::new(Outcome::Ok);
        let (status, body) = send(
            service,
            Method::POST,
            "/students",
            Some(json!({"FullName": "Ada", "age": 30})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"message": "All required fields must be provided"}));
    }

    #[tokio::test]
    async fn list_returns_bare_array() {
        let (status, body) =
            send(StubStudentService::new(Outcome::Ok), Method::GET, "/students", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().map(Vec::len), Some(1));
        assert_eq!(body[0]["grade"], "A");
    }

    #[tokio::test]
    async fn both_get_paths_reach_the_same_lookup() {
        let service = StubStudentService::new(Outcome::Ok);
        let (singular, _) = send(service.clone(), Method::GET, &format!("/student/{ID}"), None).await;
        let (plural, body) =
            send(service.clone(), Method::GET, &format!("/students/{ID}"), None).await;

        assert_eq!(singular, StatusCode::OK);
        assert_eq!(plural, StatusCode::OK);
        assert_eq!(body["FullName"], "Ada");
        assert_eq!(
            service.recorded_calls().await,
            vec![Call::Get(ID.into()), Call::Get(ID.into())]
        );
    }

    #[tokio::test]
    async fn missing_student_is_not_found_for_every_keyed_route() {
        for method in [Method::GET, Method::PUT, Method::DELETE] {
            let (status, body) = send(
                StubStudentService::new(Outcome::Missing),
                method.clone(),
                &format!("/students/{ID}"),
                None,
            )
            .await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{method}");
            assert_eq!(body, json!({"message": "Student not found"}));
        }
    }

    #[tokio::test]
    async fn update_passes_only_supplied_fields() {
        let service = StubStudentService::new(Outcome::Ok);
        let (status, body) = send(
            service.clone(),
            Method::PUT,
            &format!("/students/{ID}"),
            Some(json!({"grade": "B"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Student updated successfully");
        assert_eq!(
            service.recorded_calls().await,
            vec![Call::Update(
                ID.into(),
                StudentFields {
                    grade: Some("B".into()),
                    ..Default::default()
                }
            )]
        );
    }

    #[tokio::test]
    async fn store_failures_carry_operation_message_and_error() {
        let (status, body) = send(
            StubStudentService::new(Outcome::StoreDown),
            Method::DELETE,
            &format!("/students/{ID}"),
            None,
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Error deleting student");
        assert!(
            body["error"]
                .as_str()
                .expect("error string")
                .contains("store offline")
        );
    }
}
