//! Operator settings for pgbatch
//!
//! Holds everything that is not part of a per-run properties file: working
//! directories, archive selection, parallelism, and the optional upload and
//! notification endpoints.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::paths::BatchPaths;
use crate::error::PgBatchError;

/// Object-storage upload settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadSettings {
    /// Remote prefix the archive is copied under (e.g. `s3://bucket/pg`)
    pub storage_prefix: String,

    /// Upload tool executable
    #[serde(default = "default_upload_program")]
    pub program: String,

    /// Arguments placed before the source and destination paths
    #[serde(default = "default_upload_args")]
    pub args: Vec<String>,
}

fn default_upload_program() -> String {
    "aws".to_string()
}

fn default_upload_args() -> Vec<String> {
    vec![
        "s3".to_string(),
        "cp".to_string(),
        "--only-show-errors".to_string(),
    ]
}

/// Mail notification settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationSettings {
    pub sender: String,
    pub recipient: String,

    /// Path to a sendmail-compatible program
    #[serde(default = "default_transport_endpoint")]
    pub transport_endpoint: String,

    #[serde(default = "default_subject_prefix")]
    pub subject_prefix: String,
}

fn default_transport_endpoint() -> String {
    "/usr/sbin/sendmail".to_string()
}

fn default_subject_prefix() -> String {
    "[pgbatch]".to_string()
}

/// Operator settings for pgbatch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Directory dump files are written into
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Directory restore commands run in
    #[serde(default = "default_restore_dir")]
    pub restore_dir: PathBuf,

    /// Directory archives are written into
    #[serde(default = "default_archive_dir")]
    pub archive_dir: PathBuf,

    /// Extension (without the dot) of raw dump files
    #[serde(default = "default_dump_extension")]
    pub dump_extension: String,

    /// Number of entities processed concurrently
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,

    /// Maximum characters of tool stderr kept per failed entity
    #[serde(default = "default_max_diagnostic_chars")]
    pub max_diagnostic_chars: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload: Option<UploadSettings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification: Option<NotificationSettings>,
}

fn default_schema_version() -> u32 {
    1
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_restore_dir() -> PathBuf {
    PathBuf::from("restore_output")
}

fn default_archive_dir() -> PathBuf {
    PathBuf::from("archives")
}

fn default_dump_extension() -> String {
    "sql".to_string()
}

fn default_parallelism() -> usize {
    1
}

fn default_max_diagnostic_chars() -> usize {
    500
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            output_dir: default_output_dir(),
            restore_dir: default_restore_dir(),
            archive_dir: default_archive_dir(),
            dump_extension: default_dump_extension(),
            parallelism: default_parallelism(),
            max_diagnostic_chars: default_max_diagnostic_chars(),
            upload: None,
            notification: None,
        }
    }
}

impl Settings {
    /// Load settings from disk, or fall back to defaults if the file doesn't exist
    pub fn load_or_create(paths: &BatchPaths) -> Result<Self, PgBatchError> {
        let settings_path = paths.settings_file();

        if settings_path.exists() {
            let contents = std::fs::read_to_string(&settings_path).map_err(|e| {
                PgBatchError::Io(format!("Failed to read settings file: {}", e))
            })?;

            let settings: Settings = serde_json::from_str(&contents).map_err(|e| {
                PgBatchError::Config(format!("Failed to parse settings file: {}", e))
            })?;

            settings.validate()?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to disk
    pub fn save(&self, paths: &BatchPaths) -> Result<(), PgBatchError> {
        paths.ensure_directories()?;

        let contents = serde_json::to_string_pretty(self).map_err(|e| {
            PgBatchError::Config(format!("Failed to serialize settings: {}", e))
        })?;

        std::fs::write(paths.settings_file(), contents).map_err(|e| {
            PgBatchError::Io(format!("Failed to write settings file: {}", e))
        })?;

        Ok(())
    }

    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> Result<(), PgBatchError> {
        if self.parallelism == 0 {
            return Err(PgBatchError::Config(
                "parallelism must be at least 1".into(),
            ));
        }

        if self.dump_extension.is_empty() || self.dump_extension.starts_with('.') {
            return Err(PgBatchError::Config(format!(
                "dump_extension must be a bare extension, got '{}'",
                self.dump_extension
            )));
        }

        if let Some(upload) = &self.upload {
            if upload.storage_prefix.trim().is_empty() {
                return Err(PgBatchError::Config(
                    "upload.storage_prefix must not be empty".into(),
                ));
            }
        }

        if let Some(notification) = &self.notification {
            if notification.sender.is_empty() || notification.recipient.is_empty() {
                return Err(PgBatchError::Config(
                    "notification sender and recipient are required".into(),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.output_dir, PathBuf::from("output"));
        assert_eq!(settings.restore_dir, PathBuf::from("restore_output"));
        assert_eq!(settings.dump_extension, "sql");
        assert_eq!(settings.parallelism, 1);
        assert!(settings.upload.is_none());
        assert!(settings.notification.is_none());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let paths = BatchPaths::with_base_dir(temp_dir.path().to_path_buf());

        let mut settings = Settings::default();
        settings.parallelism = 4;
        settings.upload = Some(UploadSettings {
            storage_prefix: "s3://backups/pg".into(),
            program: default_upload_program(),
            args: default_upload_args(),
        });

        settings.save(&paths).unwrap();

        let loaded = Settings::load_or_create(&paths).unwrap();
        assert_eq!(loaded.parallelism, 4);
        assert_eq!(loaded.upload, settings.upload);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let paths = BatchPaths::with_base_dir(temp_dir.path().to_path_buf());
        std::fs::write(
            paths.settings_file(),
            r#"{"notification": {"sender": "db@example.com", "recipient": "ops@example.com"}}"#,
        )
        .unwrap();

        let loaded = Settings::load_or_create(&paths).unwrap();
        let notification = loaded.notification.unwrap();
        assert_eq!(notification.transport_endpoint, "/usr/sbin/sendmail");
        assert_eq!(notification.subject_prefix, "[pgbatch]");
        assert_eq!(loaded.max_diagnostic_chars, 500);
    }

    #[test]
    fn test_zero_parallelism_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let paths = BatchPaths::with_base_dir(temp_dir.path().to_path_buf());
        std::fs::write(paths.settings_file(), r#"{"parallelism": 0}"#).unwrap();

        let err = Settings::load_or_create(&paths).unwrap_err();
        assert!(matches!(err, PgBatchError::Config(_)));
    }

    #[test]
    fn test_dotted_extension_rejected() {
        let settings = Settings {
            dump_extension: ".sql".into(),
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }
}
