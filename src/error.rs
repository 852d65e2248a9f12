//! Structured error types for import, completion, and export.

use serde::Serialize;
use thiserror::Error;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Input errors
    DecodeError,
    MalformedCsv,
    InvalidFieldValue,

    // Result errors
    SchemaInference,

    // Conflict errors
    DoubleCompletion,

    // Not found errors
    TemplateNotFound,
    BatchNotFound,
    TaskNotFound,

    // Internal errors
    DatabaseError,
    IoError,
    InternalError,
}

/// Errors raised by the HIT pipeline and its storage layer.
#[derive(Debug, Error)]
pub enum HitError {
    /// The CSV stream is not valid UTF-8. Aborts the whole import.
    #[error("CSV input is not valid UTF-8 text (line {line}): {reason}")]
    Decode { line: u64, reason: String },

    /// The CSV stream could not be framed into records.
    #[error("malformed CSV: {0}")]
    Csv(String),

    /// A field map held something other than string values.
    #[error("invalid value for field '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    /// No single output schema could be inferred for a results table.
    #[error("cannot infer result columns: {reason}")]
    SchemaInference { reason: String },

    /// Answers were submitted for a task that is already complete.
    #[error("HIT {task_id} has already been completed")]
    DoubleCompletion { task_id: i64 },

    #[error("template not found: {0}")]
    TemplateNotFound(i64),

    #[error("batch not found: {0}")]
    BatchNotFound(i64),

    #[error("HIT not found: {0}")]
    TaskNotFound(i64),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HitError {
    /// Stable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            HitError::Decode { .. } => ErrorCode::DecodeError,
            HitError::Csv(_) => ErrorCode::MalformedCsv,
            HitError::InvalidField { .. } => ErrorCode::InvalidFieldValue,
            HitError::SchemaInference { .. } => ErrorCode::SchemaInference,
            HitError::DoubleCompletion { .. } => ErrorCode::DoubleCompletion,
            HitError::TemplateNotFound(_) => ErrorCode::TemplateNotFound,
            HitError::BatchNotFound(_) => ErrorCode::BatchNotFound,
            HitError::TaskNotFound(_) => ErrorCode::TaskNotFound,
            HitError::Database(_) | HitError::Migration(_) => ErrorCode::DatabaseError,
            HitError::Io(_) => ErrorCode::IoError,
            HitError::Json(_) => ErrorCode::InternalError,
        }
    }

    pub fn invalid_field(field: &str, reason: impl Into<String>) -> Self {
        HitError::InvalidField {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub fn schema_inference(reason: impl Into<String>) -> Self {
        HitError::SchemaInference {
            reason: reason.into(),
        }
    }
}

// The csv crate reports UTF-8 failures per record; those are fatal decode
// errors for the whole stream.
impl From<csv::Error> for HitError {
    fn from(err: csv::Error) -> Self {
        match err.into_kind() {
            csv::ErrorKind::Utf8 { pos, err } => HitError::Decode {
                line: pos.map(|p| p.line()).unwrap_or(0),
                reason: err.to_string(),
            },
            csv::ErrorKind::Io(io) => HitError::Io(io),
            other => HitError::Csv(format!("{:?}", other)),
        }
    }
}

/// Result type for pipeline operations.
pub type HitResult<T> = std::result::Result<T, HitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_serialize_screaming_snake() {
        let json = serde_json::to_string(&ErrorCode::DoubleCompletion).unwrap();
        assert_eq!(json, "\"DOUBLE_COMPLETION\"");
        let json = serde_json::to_string(&ErrorCode::SchemaInference).unwrap();
        assert_eq!(json, "\"SCHEMA_INFERENCE\"");
    }

    #[test]
    fn test_code_mapping() {
        assert_eq!(
            HitError::DoubleCompletion { task_id: 3 }.code(),
            ErrorCode::DoubleCompletion
        );
        assert_eq!(HitError::TaskNotFound(1).code(), ErrorCode::TaskNotFound);
        assert_eq!(
            HitError::schema_inference("empty").code(),
            ErrorCode::SchemaInference
        );
    }

    #[test]
    fn test_display_messages() {
        let err = HitError::DoubleCompletion { task_id: 7 };
        assert_eq!(err.to_string(), "HIT 7 has already been completed");

        let err = HitError::invalid_field("q1", "expected a string");
        assert_eq!(err.to_string(), "invalid value for field 'q1': expected a string");
    }
}
