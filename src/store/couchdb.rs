//! HTTP client wrapper for a CouchDB database holding student documents.

use crate::config::Config;
use crate::store::types::{StoreError, StudentStore, generate_student_id, parse_student_id};
use crate::student::{NewStudent, Student, StudentPatch};
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lightweight HTTP client for the student database.
pub struct CouchDbStore {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) database: String,
    pub(crate) credentials: Option<Credentials>,
}

/// Basic-auth credentials sent with every request.
#[derive(Debug, Clone)]
pub(crate) struct Credentials {
    pub(crate) user: String,
    pub(crate) password: Option<String>,
}

/// Stored form of a student. `_rev` is absent only on the first write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StudentDocument {
    #[serde(rename = "_id")]
    pub(crate) id: String,
    #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
    pub(crate) rev: Option<String>,
    #[serde(rename = "FullName")]
    pub(crate) full_name: String,
    pub(crate) age: i64,
    pub(crate) grade: String,
    #[serde(default)]
    pub(crate) image: Option<String>,
}

impl StudentDocument {
    fn from_student(student: &Student, rev: Option<String>) -> Self {
        Self {
            id: student.id.clone(),
            rev,
            full_name: student.full_name.clone(),
            age: student.age,
            grade: student.grade.clone(),
            image: student.image_path.clone(),
        }
    }

    fn into_student(self) -> Student {
        Student {
            id: self.id,
            full_name: self.full_name,
            age: self.age,
            grade: self.grade,
            image_path: self.image,
        }
    }
}

#[derive(Deserialize)]
struct AllDocsResponse {
    #[serde(default)]
    rows: Vec<AllDocsRow>,
}

#[derive(Deserialize)]
struct AllDocsRow {
    id: String,
    #[serde(default)]
    doc: Option<Value>,
}

impl CouchDbStore {
    /// Construct a new client from the loaded configuration.
    pub fn new(config: &Config) -> Result<Self, StoreError> {
        let client = Client::builder().user_agent("student-records/0.1").build()?;
        let base_url = normalize_base_url(&config.database_url).map_err(StoreError::InvalidUrl)?;
        let credentials = config.database_user.clone().map(|user| Credentials {
            user,
            password: config.database_password.clone(),
        });

        tracing::debug!(
            url = %base_url,
            database = %config.database_name,
            has_credentials = credentials.is_some(),
            "Initialized CouchDB HTTP client"
        );

        Ok(Self {
            client,
            base_url,
            database: config.database_name.clone(),
            credentials,
        })
    }

    /// Create the database when it is missing.
    pub async fn ensure_database(&self) -> Result<(), StoreError> {
        let response = self.request(Method::GET, "")?.send().await?;
        match response.status() {
            StatusCode::OK => {
                tracing::debug!(database = %self.database, "Database present");
                return Ok(());
            }
            StatusCode::NOT_FOUND => {}
            _ => return Err(self.unexpected(response, "Database existence check failed").await),
        }

        let response = self.request(Method::PUT, "")?.send().await?;
        match response.status() {
            StatusCode::CREATED | StatusCode::ACCEPTED => {
                tracing::info!(database = %self.database, "Database created");
                Ok(())
            }
            // Another instance created it between the two calls.
            StatusCode::PRECONDITION_FAILED => Ok(()),
            _ => Err(self.unexpected(response, "Failed to create database").await),
        }
    }

    async fn fetch_document(&self, id: &str) -> Result<Option<StudentDocument>, StoreError> {
        let response = self.request(Method::GET, id)?.send().await?;
        match response.status() {
            StatusCode::OK => Ok(Some(response.json().await?)),
            StatusCode::NOT_FOUND => Ok(None),
            _ => Err(self.unexpected(response, "Failed to fetch student").await),
        }
    }

    async fn put_document(&self, document: &StudentDocument) -> Result<(), StoreError> {
        let response = self
            .request(Method::PUT, &document.id)?
            .json(document)
            .send()
            .await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(self.unexpected(response, "Failed to write student").await)
        }
    }

    fn request(&self, method: Method, path: &str) -> Result<reqwest::RequestBuilder, StoreError> {
        let url = format_endpoint(&self.base_url, &self.database, path);
        let mut req = self.client.request(method, url);
        if let Some(credentials) = &self.credentials {
            req = req.basic_auth(&credentials.user, credentials.password.as_ref());
        }
        Ok(req)
    }

    async fn unexpected(&self, response: reqwest::Response, context: &str) -> StoreError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let error = StoreError::UnexpectedStatus { status, body };
        tracing::error!(database = %self.database, error = %error, "{context}");
        error
    }
}

#[async_trait]
impl StudentStore for CouchDbStore {
    async fn create(&self, student: NewStudent) -> Result<Student, StoreError> {
        let student = student.into_student(generate_student_id());
        self.put_document(&StudentDocument::from_student(&student, None))
            .await?;
        tracing::debug!(student_id = %student.id, "Student document created");
        Ok(student)
    }

    async fn find_all(&self) -> Result<Vec<Student>, StoreError> {
        let response = self
            .request(Method::GET, "_all_docs")?
            .query(&[("include_docs", "true")])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(self.unexpected(response, "Failed to list students").await);
        }

        let AllDocsResponse { rows } = response.json().await?;
        rows.into_iter()
            .filter(|row| !row.id.starts_with("_design/"))
            .filter_map(|row| row.doc)
            .map(|doc| {
                serde_json::from_value::<StudentDocument>(doc)
                    .map(StudentDocument::into_student)
                    .map_err(StoreError::from)
            })
            .collect()
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Student>, StoreError> {
        let id = parse_student_id(id)?;
        Ok(self
            .fetch_document(&id)
            .await?
            .map(StudentDocument::into_student))
    }

    async fn update_by_id(
        &self,
        id: &str,
        patch: StudentPatch,
    ) -> Result<Option<Student>, StoreError> {
        let id = parse_student_id(id)?;
        let Some(document) = self.fetch_document(&id).await? else {
            return Ok(None);
        };

        let rev = document.rev.clone();
        let mut student = document.into_student();
        patch.apply(&mut student);
        self.put_document(&StudentDocument::from_student(&student, rev))
            .await?;
        tracing::debug!(student_id = %student.id, "Student document updated");
        Ok(Some(student))
    }

    async fn delete_by_id(&self, id: &str) -> Result<Option<Student>, StoreError> {
        let id = parse_student_id(id)?;
        let Some(document) = self.fetch_document(&id).await? else {
            return Ok(None);
        };

        let mut req = self.request(Method::DELETE, &id)?;
        if let Some(rev) = &document.rev {
            req = req.query(&[("rev", rev)]);
        }
        let response = req.send().await?;
        match response.status() {
            status if status.is_success() => {
                tracing::debug!(student_id = %id, "Student document deleted");
                Ok(Some(document.into_student()))
            }
            StatusCode::NOT_FOUND => Ok(None),
            _ => Err(self.unexpected(response, "Failed to delete student").await),
        }
    }
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

fn format_endpoint(base: &str, database: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        format!("{base}/{database}")
    } else {
        format!("{base}/{database}/{path}")
    }
}
