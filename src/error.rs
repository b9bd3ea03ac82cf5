//! Custom error types for pgbatch
//!
//! This module defines the error hierarchy for the orchestrator using thiserror
//! for ergonomic error definitions.

use thiserror::Error;

/// The main error type for pgbatch operations
#[derive(Error, Debug)]
pub enum PgBatchError {
    /// Operator settings errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A properties file line that is neither a setting nor an entity record
    #[error("Malformed configuration line {line}: {reason}")]
    MalformedConfigLine { line: usize, reason: String },

    /// A key that was required but not present in the properties file
    #[error("Missing configuration key: {0}")]
    MissingConfigKey(String),

    /// The external dump/restore tool exited unsuccessfully
    #[error("External tool failed ({}): {stderr}", describe_exit(.exit_code))]
    ExternalToolFailure {
        exit_code: Option<i32>,
        stderr: String,
    },

    /// Errors while walking outputs or writing the archive
    #[error("Archive error: {0}")]
    ArchiveIo(String),

    /// The upload tool could not store the archive
    #[error("Upload failed: {0}")]
    Upload(String),

    /// The mail transport could not send the notification
    #[error("Notification dispatch failed: {0}")]
    NotificationDispatch(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

impl PgBatchError {
    /// Create a malformed-line error
    pub fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedConfigLine {
            line,
            reason: reason.into(),
        }
    }

    /// Create a missing-key error
    pub fn missing_key(key: impl Into<String>) -> Self {
        Self::MissingConfigKey(key.into())
    }

    /// Check if this error is fatal to a whole run
    ///
    /// Entity-scoped failures are recovered into the run report instead.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::MalformedConfigLine { .. } | Self::MissingConfigKey(_)
        )
    }
}

impl From<std::io::Error> for PgBatchError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for PgBatchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<walkdir::Error> for PgBatchError {
    fn from(err: walkdir::Error) -> Self {
        Self::ArchiveIo(err.to_string())
    }
}

/// Result type alias for pgbatch operations
pub type PgBatchResult<T> = Result<T, PgBatchError>;
