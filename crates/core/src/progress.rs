//! Progress-record identity and status rules.
//!
//! A progress record is keyed per user by `{courseId}_{lessonId}`. Course ids
//! never contain `_`; lesson ids may (e.g. `unit1_lesson1`), so the key is
//! split at the first separator.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Separator between course id and lesson id in a progress document id.
pub const DOC_ID_SEPARATOR: char = '_';

/// Maximum length of a course or lesson id.
pub const MAX_ID_LEN: usize = 128;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle status written by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    Pending,
    Completed,
}

impl ProgressStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProgressStatus::Pending => "pending",
            ProgressStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProgressStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ProgressStatus::Pending),
            "completed" => Ok(ProgressStatus::Completed),
            other => Err(CoreError::Validation(format!(
                "Unknown progress status '{other}'. Expected 'pending' or 'completed'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Key
// ---------------------------------------------------------------------------

/// Identity of a progress record within one user's progress collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProgressKey {
    pub course_id: String,
    pub lesson_id: String,
}

impl ProgressKey {
    /// Build a key from its parts, validating both.
    pub fn new(course_id: &str, lesson_id: &str) -> Result<Self, CoreError> {
        validate_course_id(course_id)?;
        validate_lesson_id(lesson_id)?;
        Ok(Self {
            course_id: course_id.to_string(),
            lesson_id: lesson_id.to_string(),
        })
    }

    /// Parse a `{courseId}_{lessonId}` document id.
    pub fn parse(doc_id: &str) -> Result<Self, CoreError> {
        let (course_id, lesson_id) = doc_id.split_once(DOC_ID_SEPARATOR).ok_or_else(|| {
            CoreError::Validation(format!(
                "Progress id '{doc_id}' must have the form {{courseId}}_{{lessonId}}"
            ))
        })?;
        Self::new(course_id, lesson_id)
    }

    /// The document id this key is stored under.
    pub fn doc_id(&self) -> String {
        format!("{}{DOC_ID_SEPARATOR}{}", self.course_id, self.lesson_id)
    }
}

/// Check a course id on its own, e.g. a course filter.
pub fn validate_course_id(course_id: &str) -> Result<(), CoreError> {
    if course_id.is_empty() {
        return Err(CoreError::Validation("course id must not be empty".into()));
    }
    if course_id.contains(DOC_ID_SEPARATOR) {
        return Err(CoreError::Validation(format!(
            "course id '{course_id}' must not contain '{DOC_ID_SEPARATOR}'"
        )));
    }
    validate_id_chars("course id", course_id)
}

fn validate_lesson_id(lesson_id: &str) -> Result<(), CoreError> {
    if lesson_id.is_empty() {
        return Err(CoreError::Validation("lesson id must not be empty".into()));
    }
    validate_id_chars("lesson id", lesson_id)
}

fn validate_id_chars(label: &str, id: &str) -> Result<(), CoreError> {
    if id.len() > MAX_ID_LEN {
        return Err(CoreError::Validation(format!(
            "{label} exceeds {MAX_ID_LEN} characters"
        )));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(CoreError::Validation(format!(
            "{label} '{id}' may only contain ASCII letters, digits, '-' and '_'"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_splits_at_first_separator() {
        let key = ProgressKey::parse("courseA_unit1_lesson1").unwrap();
        assert_eq!(key.course_id, "courseA");
        assert_eq!(key.lesson_id, "unit1_lesson1");
        assert_eq!(key.doc_id(), "courseA_unit1_lesson1");
    }

    #[test]
    fn parse_rejects_missing_separator() {
        assert_matches!(
            ProgressKey::parse("courseAlesson1"),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn parse_rejects_empty_parts() {
        assert!(ProgressKey::parse("_lesson1").is_err());
        assert!(ProgressKey::parse("courseA_").is_err());
    }

    #[test]
    fn new_rejects_separator_in_course_id() {
        assert!(ProgressKey::new("course_A", "lesson1").is_err());
    }

    #[test]
    fn new_rejects_path_characters() {
        assert!(ProgressKey::new("courseA", "../lesson").is_err());
        assert!(ProgressKey::new("course A", "lesson1").is_err());
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [ProgressStatus::Pending, ProgressStatus::Completed] {
            assert_eq!(status.as_str().parse::<ProgressStatus>().unwrap(), status);
        }
    }

    #[test]
    fn unknown_status_is_validation_error() {
        assert_matches!(
            "done".parse::<ProgressStatus>(),
            Err(CoreError::Validation(_))
        );
    }
}
