//! Path management for pgbatch
//!
//! Resolves where the operator settings live.
//!
//! ## Path Resolution Order
//!
//! 1. `PGBATCH_CONFIG_DIR` environment variable (if set)
//! 2. The platform configuration directory (`~/.config/pgbatch` on Linux)

use std::path::PathBuf;

use directories::ProjectDirs;

use crate::error::PgBatchError;

/// Manages the paths used by pgbatch
#[derive(Debug, Clone)]
pub struct BatchPaths {
    /// Base directory for pgbatch configuration
    base_dir: PathBuf,
}

impl BatchPaths {
    /// Create a new BatchPaths instance
    ///
    /// # Errors
    ///
    /// Returns an error if no home directory can be determined.
    pub fn new() -> Result<Self, PgBatchError> {
        let base_dir = if let Ok(custom) = std::env::var("PGBATCH_CONFIG_DIR") {
            PathBuf::from(custom)
        } else {
            resolve_default_path()?
        };

        Ok(Self { base_dir })
    }

    /// Create BatchPaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the path to the settings file
    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Ensure the configuration directory exists
    pub fn ensure_directories(&self) -> Result<(), PgBatchError> {
        std::fs::create_dir_all(&self.base_dir)
            .map_err(|e| PgBatchError::Io(format!("Failed to create config directory: {}", e)))
    }
}

fn resolve_default_path() -> Result<PathBuf, PgBatchError> {
    ProjectDirs::from("", "", "pgbatch")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| PgBatchError::Config("Could not determine home directory".into()))
}
