//! Custom error types for the payroll preparation pipeline.
//!
//! This module provides the error hierarchy using `thiserror`. Stage
//! internals work with `anyhow::Result` and are mapped into [`PrepError`]
//! at stage boundaries, so callers see one error type with a stable code.
//!
//! Errors are serializable, which lets the CLI emit them as JSON.

use serde::Serialize;
use serde::ser::SerializeStruct;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the payroll preparation pipeline.
#[derive(Error, Debug)]
pub enum PrepError {
    /// An input file is missing or could not be parsed as CSV.
    #[error("Failed to load input file '{}': {reason}", .path.display())]
    InputFile { path: PathBuf, reason: String },

    /// An input table lacks columns the pipeline depends on.
    #[error("Table '{table}' is missing required columns: {}", .columns.join(", "))]
    MissingColumns { table: String, columns: Vec<String> },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Cleaning a table failed.
    #[error("Failed to clean data: {0}")]
    CleaningFailed(String),

    /// Joining the tables failed.
    #[error("Failed to merge tables: {0}")]
    MergeFailed(String),

    /// Exchange rate lookup failed.
    #[error("Exchange rate lookup failed: {0}")]
    RateFetch(String),

    /// Appending to the database table failed.
    #[error("Database insert failed: {0}")]
    Database(String),

    /// Writing the CSV backup failed.
    #[error("Failed to write backup '{}': {reason}", .path.display())]
    Backup { path: PathBuf, reason: String },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<PrepError>,
    },
}

impl PrepError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PrepError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get a stable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InputFile { .. } => "INPUT_FILE",
            Self::MissingColumns { .. } => "MISSING_COLUMNS",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::CleaningFailed(_) => "CLEANING_FAILED",
            Self::MergeFailed(_) => "MERGE_FAILED",
            Self::RateFetch(_) => "RATE_FETCH",
            Self::Database(_) => "DATABASE",
            Self::Backup { .. } => "BACKUP_FAILED",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Process exit code for this error.
    ///
    /// | code | meaning                                   |
    /// |------|-------------------------------------------|
    /// | 1    | unexpected / internal failure             |
    /// | 2    | input file missing, malformed or partial  |
    /// | 3    | invalid configuration                     |
    /// | 4    | backup could not be written               |
    /// | 5    | cleaning or merging failed                |
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::InputFile { .. } | Self::MissingColumns { .. } => 2,
            Self::InvalidConfig(_) => 3,
            Self::Backup { .. } => 4,
            Self::CleaningFailed(_) | Self::MergeFailed(_) => 5,
            Self::WithContext { source, .. } => source.exit_code(),
            _ => 1,
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for PrepError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("PrepError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PrepError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(
            PrepError::RateFetch("timeout".to_string()).error_code(),
            "RATE_FETCH"
        );
        assert_eq!(
            PrepError::MissingColumns {
                table: "employees".to_string(),
                columns: vec!["email".to_string()],
            }
            .error_code(),
            "MISSING_COLUMNS"
        );
    }

    #[test]
    fn test_exit_codes() {
        let input = PrepError::InputFile {
            path: PathBuf::from("hr_data.csv"),
            reason: "not found".to_string(),
        };
        assert_eq!(input.exit_code(), 2);
        assert_eq!(PrepError::InvalidConfig("x".to_string()).exit_code(), 3);
        assert_eq!(
            PrepError::Backup {
                path: PathBuf::from("out.csv"),
                reason: "denied".to_string(),
            }
            .exit_code(),
            4
        );
        assert_eq!(PrepError::MergeFailed("x".to_string()).exit_code(), 5);
    }

    #[test]
    fn test_error_serialization() {
        let error = PrepError::MergeFailed("no 'salary' column".to_string());
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["code"], "MERGE_FAILED");
        assert!(json["message"].as_str().unwrap().contains("salary"));
    }

    #[test]
    fn test_with_context() {
        let error = PrepError::InputFile {
            path: PathBuf::from("salary_data.csv"),
            reason: "truncated".to_string(),
        }
        .with_context("While loading salaries");
        assert!(error.to_string().contains("While loading salaries"));
        assert_eq!(error.error_code(), "INPUT_FILE");
        assert_eq!(error.exit_code(), 2);
    }
}
