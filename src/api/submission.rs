//! Request body extraction for create and update.
//!
//! Clients may send `multipart/form-data` (with an optional `image` file part),
//! `application/json`, or `application/x-www-form-urlencoded`. Any other content type is
//! read as an empty submission.

use crate::student::{StudentFields, ValidationError};
use crate::uploads::ImageUpload;
use axum::{
    Form, Json, async_trait,
    extract::{
        FromRequest, Multipart, Request,
        multipart::{MultipartError, MultipartRejection},
        rejection::{FormRejection, JsonRejection},
    },
    http::{StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

const FULL_NAME_FIELD: &str = "FullName";
const AGE_FIELD: &str = "age";
const GRADE_FIELD: &str = "grade";
const IMAGE_FIELD: &str = "image";

/// Fields and optional image carried by a create or update request.
#[derive(Debug, Default)]
pub struct StudentSubmission {
    /// Text fields, blanks already dropped.
    pub fields: StudentFields,
    /// Uploaded `image` file, if one was attached.
    pub image: Option<ImageUpload>,
}

/// Reasons a request body could not be turned into a [`StudentSubmission`].
#[derive(Debug, Error)]
pub enum SubmissionRejection {
    /// Multipart boundary or header problems.
    #[error("Invalid multipart body: {0}")]
    MultipartHeader(#[from] MultipartRejection),
    /// The multipart stream broke while reading a part.
    #[error("Invalid multipart body: {0}")]
    MultipartStream(#[from] MultipartError),
    /// JSON body failed to parse.
    #[error("Invalid JSON body: {0}")]
    Json(#[from] JsonRejection),
    /// Urlencoded body failed to parse.
    #[error("Invalid form body: {0}")]
    Form(#[from] FormRejection),
    /// A field was present but unusable.
    #[error(transparent)]
    Field(#[from] ValidationError),
}

impl IntoResponse for SubmissionRejection {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::MultipartHeader(rejection) => rejection.status(),
            Self::MultipartStream(error) => error.status(),
            Self::Json(rejection) => bad_request_unless_too_large(rejection.status()),
            Self::Form(rejection) => bad_request_unless_too_large(rejection.status()),
            Self::Field(_) => StatusCode::BAD_REQUEST,
        };
        tracing::debug!(%status, error = %self, "Rejected student submission");
        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}

fn bad_request_unless_too_large(status: StatusCode) -> StatusCode {
    match status {
        StatusCode::PAYLOAD_TOO_LARGE => status,
        _ => StatusCode::BAD_REQUEST,
    }
}

/// Text body shape shared by JSON and urlencoded requests.
#[derive(Debug, Default, Deserialize)]
struct TextSubmission {
    #[serde(rename = "FullName", default)]
    full_name: Option<String>,
    #[serde(default)]
    age: Option<AgeInput>,
    #[serde(default)]
    grade: Option<String>,
}

/// JSON clients send `age` as a number; forms send it as text.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AgeInput {
    Number(i64),
    Text(String),
}

impl TextSubmission {
    fn into_fields(self) -> Result<StudentFields, ValidationError> {
        let age = self.age.map(|age| match age {
            AgeInput::Number(value) => value.to_string(),
            AgeInput::Text(value) => value,
        });
        StudentFields::from_text(self.full_name, age, self.grade)
    }
}

#[async_trait]
impl<S> FromRequest<S> for StudentSubmission
where
    S: Send + Sync,
{
    type Rejection = SubmissionRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_ascii_lowercase())
            .unwrap_or_default();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state).await?;
            read_multipart(multipart).await
        } else if content_type.starts_with("application/json") {
            let Json(body) = Json::<TextSubmission>::from_request(req, state).await?;
            Ok(Self {
                fields: body.into_fields()?,
                image: None,
            })
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(body) = Form::<TextSubmission>::from_request(req, state).await?;
            Ok(Self {
                fields: body.into_fields()?,
                image: None,
            })
        } else {
            Ok(Self::default())
        }
    }
}

async fn read_multipart(mut multipart: Multipart) -> Result<StudentSubmission, SubmissionRejection> {
    let mut full_name = None;
    let mut age = None;
    let mut grade = None;
    let mut image = None;

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        match name.as_str() {
            FULL_NAME_FIELD => full_name = Some(field.text().await?),
            AGE_FIELD => age = Some(field.text().await?),
            GRADE_FIELD => grade = Some(field.text().await?),
            IMAGE_FIELD => {
                let file_name = field.file_name().unwrap_or_default().to_owned();
                let bytes = field.bytes().await?;
                // Browsers send an empty part when no file was chosen.
                if file_name.is_empty() && bytes.is_empty() {
                    continue;
                }
                image = Some(ImageUpload { file_name, bytes });
            }
            other => tracing::debug!(field = other, "Ignoring unknown multipart field"),
        }
    }

    Ok(StudentSubmission {
        fields: StudentFields::from_text(full_name, age, grade)?,
        image,
    })
}
