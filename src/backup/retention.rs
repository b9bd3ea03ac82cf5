//! Removal of local artifacts once they are safely stored remotely
//!
//! Callers must only invoke [`RetentionPolicy::cleanup`] after a confirmed
//! upload; a failed upload leaves every file in place for manual recovery.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{PgBatchError, PgBatchResult};

use super::archive::{outside_dir, ARCHIVE_SUFFIX};

/// Decides which local files a successful run may delete
#[derive(Debug, Clone)]
pub struct RetentionPolicy {
    dump_extension: String,
}

impl RetentionPolicy {
    pub fn new(dump_extension: impl Into<String>) -> Self {
        Self {
            dump_extension: dump_extension.into(),
        }
    }

    /// Delete raw dumps under `output_dir` and archives in `archive_dir`
    ///
    /// Returns the deleted paths.
    pub fn cleanup(&self, output_dir: &Path, archive_dir: &Path) -> PgBatchResult<Vec<PathBuf>> {
        let mut deleted = Vec::new();

        for path in self.matching_dumps(output_dir, archive_dir)? {
            remove(&path)?;
            deleted.push(path);
        }

        for path in matching_archives(archive_dir)? {
            remove(&path)?;
            deleted.push(path);
        }

        log::info!("Removed {} local file(s) after upload", deleted.len());
        Ok(deleted)
    }

    fn matching_dumps(&self, output_dir: &Path, archive_dir: &Path) -> PgBatchResult<Vec<PathBuf>> {
        if !output_dir.exists() {
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        let skip = fs::canonicalize(archive_dir).ok();
        let walker = WalkDir::new(output_dir)
            .into_iter()
            .filter_entry(outside_dir(skip.as_deref()));
        for entry in walker {
            let entry = entry.map_err(|e| PgBatchError::Io(e.to_string()))?;
            if entry.file_type().is_file()
                && entry.path().extension() == Some(OsStr::new(&self.dump_extension))
            {
                paths.push(entry.into_path());
            }
        }
        Ok(paths)
    }
}

fn matching_archives(archive_dir: &Path) -> PgBatchResult<Vec<PathBuf>> {
    if !archive_dir.exists() {
        return Ok(Vec::new());
    }

    let mut paths = Vec::new();
    for entry in fs::read_dir(archive_dir).map_err(|e| {
        PgBatchError::Io(format!("Failed to read archive directory: {}", e))
    })? {
        let entry = entry.map_err(|e| {
            PgBatchError::Io(format!("Failed to read directory entry: {}", e))
        })?;
        let path = entry.path();
        if path.is_file() && path.to_string_lossy().ends_with(ARCHIVE_SUFFIX) {
            paths.push(path);
        }
    }
    Ok(paths)
}

fn remove(path: &Path) -> PgBatchResult<()> {
    fs::remove_file(path).map_err(|e| {
        PgBatchError::Io(format!("Failed to delete {}: {}", path.display(), e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cleanup_removes_matching_files_only() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("output");
        let archives = temp_dir.path().join("archives");
        fs::create_dir_all(output.join("nested")).unwrap();
        fs::create_dir_all(&archives).unwrap();
        fs::write(output.join("alice_1.sql"), b"a").unwrap();
        fs::write(output.join("nested").join("bob_1.sql"), b"b").unwrap();
        fs::write(output.join("keep.log"), b"k").unwrap();
        fs::write(archives.join("backup_1.tar.gz"), b"z").unwrap();
        fs::write(archives.join("README"), b"r").unwrap();

        let deleted = RetentionPolicy::new("sql").cleanup(&output, &archives).unwrap();

        assert_eq!(deleted.len(), 3);
        assert!(!output.join("alice_1.sql").exists());
        assert!(!output.join("nested").join("bob_1.sql").exists());
        assert!(!archives.join("backup_1.tar.gz").exists());
        assert!(output.join("keep.log").exists());
        assert!(archives.join("README").exists());
    }

    #[test]
    fn test_nested_archive_dir_dumps_untouched_by_dump_pass() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("output");
        let archives = output.join("archives");
        fs::create_dir_all(&archives).unwrap();
        fs::create_dir_all(output.join("nested")).unwrap();
        fs::write(output.join("alice_1.sql"), b"a").unwrap();
        fs::write(archives.join("manual.sql"), b"m").unwrap();

        let roundabout = output.join("nested").join("..").join("archives");
        let deleted = RetentionPolicy::new("sql").cleanup(&output, &roundabout).unwrap();

        assert_eq!(deleted, vec![output.join("alice_1.sql")]);
        assert!(archives.join("manual.sql").exists());
    }

    #[test]
    fn test_cleanup_missing_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let deleted = RetentionPolicy::new("sql")
            .cleanup(&temp_dir.path().join("a"), &temp_dir.path().join("b"))
            .unwrap();
        assert!(deleted.is_empty());
    }
}
