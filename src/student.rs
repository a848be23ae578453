//! The student entity and the field sets used to create and patch it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message returned to clients when a create request lacks a required field.
pub const MISSING_FIELDS_MESSAGE: &str = "All required fields must be provided";

/// A stored student record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    /// Identifier assigned by the store at creation.
    pub id: String,
    /// Student's full name.
    #[serde(rename = "FullName")]
    pub full_name: String,
    /// Age in years. Not range checked.
    pub age: i64,
    /// Grade or class label.
    pub grade: String,
    /// Relative path of the uploaded image, when one was attached.
    #[serde(rename = "image")]
    pub image_path: Option<String>,
}

/// Raised when a create request is missing one of the required fields.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// `FullName`, `age` or `grade` was absent or blank.
    #[error("All required fields must be provided")]
    MissingFields,
    /// `age` was supplied but is not an integer.
    #[error("age must be an integer, got '{0}'")]
    InvalidAge(String),
}

/// Fields supplied by a client on create or update. Every field is optional here; presence
/// rules are applied when converting into [`NewStudent`] or [`StudentPatch`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentFields {
    /// Supplied `FullName`, already trimmed of blank values.
    pub full_name: Option<String>,
    /// Supplied `age`.
    pub age: Option<i64>,
    /// Supplied `grade`, already trimmed of blank values.
    pub grade: Option<String>,
}

impl StudentFields {
    /// Build a field set from raw text inputs, dropping blanks and parsing `age`.
    pub fn from_text(
        full_name: Option<String>,
        age: Option<String>,
        grade: Option<String>,
    ) -> Result<Self, ValidationError> {
        let age = non_blank(age)
            .map(|value| {
                value
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| ValidationError::InvalidAge(value))
            })
            .transpose()?;

        Ok(Self {
            full_name: non_blank(full_name),
            age,
            grade: non_blank(grade),
        })
    }
}

/// A validated set of fields for a new record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStudent {
    /// Student's full name.
    pub full_name: String,
    /// Age in years.
    pub age: i64,
    /// Grade label.
    pub grade: String,
    /// Path of an image written before the record.
    pub image_path: Option<String>,
}

impl NewStudent {
    /// Apply the create presence rules to a client field set.
    pub fn try_from_fields(fields: StudentFields) -> Result<Self, ValidationError> {
        match fields {
            StudentFields {
                full_name: Some(full_name),
                age: Some(age),
                grade: Some(grade),
            } => Ok(Self {
                full_name,
                age,
                grade,
                image_path: None,
            }),
            _ => Err(ValidationError::MissingFields),
        }
    }

    /// Attach the path of an already written image.
    pub fn with_image_path(mut self, image_path: Option<String>) -> Self {
        self.image_path = image_path;
        self
    }

    /// Materialize the stored entity under the identifier chosen by the store.
    pub fn into_student(self, id: String) -> Student {
        Student {
            id,
            full_name: self.full_name,
            age: self.age,
            grade: self.grade,
            image_path: self.image_path,
        }
    }
}

/// A partial update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentPatch {
    /// Replacement `FullName`.
    pub full_name: Option<String>,
    /// Replacement `age`.
    pub age: Option<i64>,
    /// Replacement `grade`.
    pub grade: Option<String>,
    /// Replacement image path; only set when a new file was uploaded.
    pub image_path: Option<String>,
}

impl StudentPatch {
    /// Build a patch from client fields plus an optional freshly written image.
    pub fn new(fields: StudentFields, image_path: Option<String>) -> Self {
        Self {
            full_name: fields.full_name,
            age: fields.age,
            grade: fields.grade,
            image_path,
        }
    }

    /// Apply the patch to a stored record in place.
    pub fn apply(self, student: &mut Student) {
        if let Some(full_name) = self.full_name {
            student.full_name = full_name;
        }
        if let Some(age) = self.age {
            student.age = age;
        }
        if let Some(grade) = self.grade {
            student.grade = grade;
        }
        if let Some(image_path) = self.image_path {
            student.image_path = Some(image_path);
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ada() -> Student {
        Student {
            id: "0f8c3b5e9a1d4e2f8b7c6d5e4f3a2b1c".into(),
            full_name: "Ada".into(),
            age: 30,
            grade: "A".into(),
            image_path: None,
        }
    }

    #[test]
    fn student_serializes_with_wire_field_names() {
        let value = serde_json::to_value(ada()).expect("serialize");
        assert_eq!(
            value,
            json!({
                "id": "0f8c3b5e9a1d4e2f8b7c6d5e4f3a2b1c",
                "FullName": "Ada",
                "age": 30,
                "grade": "A",
                "image": null
            })
        );
    }

    #[test]
    fn from_text_drops_blanks_and_parses_age() {
        let fields = StudentFields::from_text(Some("  ".into()), Some(" 12 ".into()), None)
            .expect("fields");
        assert_eq!(fields.full_name, None);
        assert_eq!(fields.age, Some(12));
        assert_eq!(fields.grade, None);
    }

    #[test]
    fn from_text_rejects_non_integer_age() {
        let err = StudentFields::from_text(None, Some("twelve".into()), None).unwrap_err();
        assert_eq!(err, ValidationError::InvalidAge("twelve".into()));
    }

    #[test]
    fn negative_age_is_accepted() {
        let fields = StudentFields::from_text(Some("Bo".into()), Some("-4".into()), Some("C".into()))
            .expect("fields");
        let new = NewStudent::try_from_fields(fields).expect("valid");
        assert_eq!(new.age, -4);
    }

    #[test]
    fn create_requires_every_field() {
        let missing_grade = StudentFields {
            full_name: Some("Ada".into()),
            age: Some(30),
            grade: None,
        };
        assert_eq!(
            NewStudent::try_from_fields(missing_grade),
            Err(ValidationError::MissingFields)
        );
        assert_eq!(
            ValidationError::MissingFields.to_string(),
            MISSING_FIELDS_MESSAGE
        );
    }

    #[test]
    fn patch_only_touches_supplied_fields() {
        let mut student = ada();
        student.image_path = Some("uploads/1.png".into());

        StudentPatch::new(
            StudentFields {
                grade: Some("B".into()),
                ..Default::default()
            },
            None,
        )
        .apply(&mut student);

        assert_eq!(student.full_name, "Ada");
        assert_eq!(student.age, 30);
        assert_eq!(student.grade, "B");
        assert_eq!(student.image_path.as_deref(), Some("uploads/1.png"));
    }
}
