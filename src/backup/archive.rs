//! Packs a run's dump files into a single `.tar.gz`
//!
//! Packing is two-pass: the first pass walks the output directory and sums
//! the sizes of matching files, the second appends them while reporting the
//! cumulative fraction written.

use std::ffi::OsStr;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;
use walkdir::WalkDir;

use crate::error::{PgBatchError, PgBatchResult};
use crate::models::RunStamp;

/// Suffix of every archive this module writes
pub const ARCHIVE_SUFFIX: &str = ".tar.gz";

/// A packaged set of raw output files
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveArtifact {
    pub path: PathBuf,
    /// Size of the compressed archive on disk
    pub size_bytes: u64,
    /// Sum of the sizes of the files packed into it
    pub source_bytes: u64,
    pub file_count: usize,
}

impl ArchiveArtifact {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Progress update emitted after each packed file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveProgress {
    pub bytes_added: u64,
    pub total_bytes: u64,
}

impl ArchiveProgress {
    /// Fraction complete in `[0, 1]`; an empty input counts as complete
    pub fn fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            return 1.0;
        }
        (self.bytes_added as f64 / self.total_bytes as f64).min(1.0)
    }
}

/// Packs files with one extension from an output directory
#[derive(Debug, Clone)]
pub struct Archiver {
    archive_dir: PathBuf,
    extension: String,
}

impl Archiver {
    pub fn new(archive_dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            archive_dir: archive_dir.into(),
            extension: extension.into(),
        }
    }

    pub fn archive_dir(&self) -> &Path {
        &self.archive_dir
    }

    /// `{archive_dir}/backup_{stamp}.tar.gz`
    pub fn archive_path(&self, stamp: &RunStamp) -> PathBuf {
        self.archive_dir
            .join(format!("backup_{}{}", stamp, ARCHIVE_SUFFIX))
    }

    /// First pass: matching files with their sizes, in file-name order
    pub fn collect(&self, output_dir: &Path) -> PgBatchResult<Vec<(PathBuf, u64)>> {
        if !output_dir.exists() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        let skip = fs::canonicalize(&self.archive_dir).ok();
        let walker = WalkDir::new(output_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(outside_dir(skip.as_deref()));

        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            if entry.path().extension() != Some(OsStr::new(&self.extension)) {
                continue;
            }
            let size = entry
                .metadata()
                .map_err(|e| PgBatchError::ArchiveIo(e.to_string()))?
                .len();
            files.push((entry.into_path(), size));
        }

        Ok(files)
    }

    /// Pack every matching file under `output_dir` into this run's archive
    ///
    /// `on_progress` sees a non-decreasing fraction that ends at exactly 1.0.
    /// Entries are stored under their base file name only.
    pub fn pack<F>(
        &self,
        output_dir: &Path,
        stamp: &RunStamp,
        mut on_progress: F,
    ) -> PgBatchResult<ArchiveArtifact>
    where
        F: FnMut(ArchiveProgress),
    {
        let files = self.collect(output_dir)?;
        let total_bytes: u64 = files.iter().map(|(_, size)| size).sum();

        if total_bytes == 0 {
            on_progress(ArchiveProgress {
                bytes_added: 0,
                total_bytes: 0,
            });
        }

        fs::create_dir_all(&self.archive_dir).map_err(|e| {
            PgBatchError::ArchiveIo(format!("Failed to create archive directory: {}", e))
        })?;

        let path = self.archive_path(stamp);
        let file = File::create(&path).map_err(|e| {
            PgBatchError::ArchiveIo(format!("Failed to create {}: {}", path.display(), e))
        })?;
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));

        let mut bytes_added = 0;
        for (source, size) in &files {
            let name = source.file_name().ok_or_else(|| {
                PgBatchError::ArchiveIo(format!("No file name in {}", source.display()))
            })?;
            builder.append_path_with_name(source, name).map_err(|e| {
                PgBatchError::ArchiveIo(format!("Failed to add {}: {}", source.display(), e))
            })?;

            if total_bytes > 0 {
                bytes_added += size;
                on_progress(ArchiveProgress {
                    bytes_added,
                    total_bytes,
                });
            }
        }

        let encoder = builder
            .into_inner()
            .map_err(|e| PgBatchError::ArchiveIo(format!("Failed to finish archive: {}", e)))?;
        let file = encoder
            .finish()
            .map_err(|e| PgBatchError::ArchiveIo(format!("Failed to compress archive: {}", e)))?;
        file.sync_all()
            .map_err(|e| PgBatchError::ArchiveIo(format!("Failed to flush archive: {}", e)))?;

        let size_bytes = fs::metadata(&path)
            .map_err(|e| PgBatchError::ArchiveIo(e.to_string()))?
            .len();

        log::info!(
            "Archived {} file(s), {} bytes into {}",
            files.len(),
            total_bytes,
            path.display()
        );

        Ok(ArchiveArtifact {
            path,
            size_bytes,
            source_bytes: total_bytes,
            file_count: files.len(),
        })
    }
}

/// Walk filter that prunes the directory `skip` (already canonicalized)
///
/// Directories are compared by canonical path, so a relative, absolute or
/// `..`-laden spelling of the archive directory is still recognised.
pub(crate) fn outside_dir(skip: Option<&Path>) -> impl FnMut(&walkdir::DirEntry) -> bool + '_ {
    move |entry| {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return true;
        }
        match skip {
            Some(skip) => fs::canonicalize(entry.path()).map_or(true, |p| p != skip),
            None => true,
        }
    }
}
