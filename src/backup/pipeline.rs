//! One full run: entity loop, report, archive, upload, conditional cleanup
//!
//! The ordering is fixed. Local files are deleted only after the upload of
//! this run's archive is confirmed; any earlier failure leaves them in place.

use std::path::{Path, PathBuf};

use crate::config::{Properties, Settings};
use crate::error::PgBatchResult;
use crate::models::{Mode, RunReport, RunStamp};
use crate::reports::{deliver, render_notification, Notifier};
use crate::runner::ProcessRunner;

use super::archive::{ArchiveArtifact, ArchiveProgress, Archiver};
use super::orchestrator::Orchestrator;
use super::retention::RetentionPolicy;
use super::upload::{UploadResult, Uploader};

/// What happened to the archive after packing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadStatus {
    /// No upload was attempted, with the reason
    NotAttempted(String),
    Uploaded { destination: String },
    Failed { reason: String },
}

/// Overall result of a run, mapped to the process exit code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every entity succeeded and the upload (if attempted) succeeded
    Clean,
    EntityFailures,
    /// Archive or upload failed while every entity succeeded
    TransferFailed,
    EntityAndTransferFailures,
}

impl RunStatus {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Clean => 0,
            Self::EntityFailures => 3,
            Self::TransferFailed => 4,
            Self::EntityAndTransferFailures => 5,
        }
    }

    pub fn is_clean(&self) -> bool {
        *self == Self::Clean
    }
}

/// Everything a run produced
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub stamp: RunStamp,
    pub report: RunReport,
    pub archive: Option<ArchiveArtifact>,
    /// Set when packing failed; entity outcomes are unaffected
    pub archive_error: Option<String>,
    pub upload: UploadStatus,
    /// Local files removed after a confirmed upload
    pub cleaned: Vec<PathBuf>,
    pub cleanup_error: Option<String>,
    pub notified: bool,
}

impl RunSummary {
    pub fn status(&self) -> RunStatus {
        let transfer_failed =
            self.archive_error.is_some() || matches!(self.upload, UploadStatus::Failed { .. });
        match (self.report.has_failures(), transfer_failed) {
            (false, false) => RunStatus::Clean,
            (true, false) => RunStatus::EntityFailures,
            (false, true) => RunStatus::TransferFailed,
            (true, true) => RunStatus::EntityAndTransferFailures,
        }
    }
}

/// Runs the whole pipeline for one properties file
pub struct Pipeline<'a> {
    settings: &'a Settings,
    runner: &'a dyn ProcessRunner,
    uploader: Option<&'a dyn Uploader>,
    notifier: Option<&'a dyn Notifier>,
}

impl<'a> Pipeline<'a> {
    pub fn new(settings: &'a Settings, runner: &'a dyn ProcessRunner) -> Self {
        Self {
            settings,
            runner,
            uploader: None,
            notifier: None,
        }
    }

    pub fn with_uploader(mut self, uploader: &'a dyn Uploader) -> Self {
        self.uploader = Some(uploader);
        self
    }

    pub fn with_notifier(mut self, notifier: &'a dyn Notifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Working directory external tools run in for `mode`
    pub fn working_dir(&self, mode: Mode) -> &Path {
        match mode {
            Mode::Backup => &self.settings.output_dir,
            Mode::Restore => &self.settings.restore_dir,
        }
    }

    /// Execute a run
    ///
    /// # Errors
    ///
    /// Only configuration errors detected before the entity loop are
    /// returned. Entity, archive, upload, cleanup and notification failures
    /// are recorded in the summary instead.
    pub fn run<F>(
        &self,
        mode: Mode,
        properties: &Properties,
        stamp: RunStamp,
        on_progress: F,
    ) -> PgBatchResult<RunSummary>
    where
        F: FnMut(ArchiveProgress),
    {
        let report = Orchestrator::new(self.runner)
            .with_parallelism(self.settings.parallelism)
            .run(
                mode,
                &properties.shared,
                &properties.entities,
                &stamp,
                self.working_dir(mode),
            )?;

        let notified = self.notify(&report);

        let mut summary = RunSummary {
            stamp,
            report,
            archive: None,
            archive_error: None,
            upload: UploadStatus::NotAttempted("restore runs are not archived".into()),
            cleaned: Vec::new(),
            cleanup_error: None,
            notified,
        };

        if mode == Mode::Backup {
            self.transfer(&mut summary, on_progress);
        }

        Ok(summary)
    }

    fn notify(&self, report: &RunReport) -> bool {
        match (self.notifier, &self.settings.notification) {
            (Some(notifier), Some(settings)) => {
                deliver(notifier, &render_notification(report, settings))
            }
            _ => {
                log::info!("No notification configured; skipping");
                false
            }
        }
    }

    /// Archive, upload and, only on confirmed upload, clean up
    fn transfer<F>(&self, summary: &mut RunSummary, on_progress: F)
    where
        F: FnMut(ArchiveProgress),
    {
        let archiver = Archiver::new(&self.settings.archive_dir, &self.settings.dump_extension);
        let artifact = match archiver.pack(&self.settings.output_dir, &summary.stamp, on_progress) {
            Ok(artifact) => artifact,
            Err(e) => {
                log::error!("{}", e);
                summary.archive_error = Some(e.to_string());
                summary.upload = UploadStatus::NotAttempted("archive failed".into());
                return;
            }
        };

        summary.upload = if artifact.file_count == 0 {
            log::warn!("No dump files to upload");
            UploadStatus::NotAttempted("archive is empty".into())
        } else {
            match self.uploader {
                None => UploadStatus::NotAttempted("upload not configured".into()),
                Some(uploader) => match uploader.upload(&artifact) {
                    UploadResult::Uploaded { destination } => UploadStatus::Uploaded { destination },
                    UploadResult::Failed { reason } => UploadStatus::Failed { reason },
                },
            }
        };
        summary.archive = Some(artifact);

        if let UploadStatus::Uploaded { .. } = summary.upload {
            let retention = RetentionPolicy::new(&self.settings.dump_extension);
            match retention.cleanup(&self.settings.output_dir, &self.settings.archive_dir) {
                Ok(deleted) => summary.cleaned = deleted,
                Err(e) => {
                    log::error!("Cleanup after upload failed: {}", e);
                    summary.cleanup_error = Some(e.to_string());
                }
            }
        } else {
            log::info!("Keeping local files; upload did not complete");
        }
    }
}

impl RunSummary {
    /// Format the summary for terminal output
    pub fn format_terminal(&self) -> String {
        let mut output = String::new();
        let mode = self.report.mode.label();

        output.push_str(&format!("{} run {}\n", mode, self.stamp));
        output.push_str(&"=".repeat(mode.len() + 5 + self.stamp.as_str().len()));
        output.push('\n');

        let successes = self.report.successes();
        let failures = self.report.failures();
        output.push_str(&format!("Succeeded ({}):\n", successes.len()));
        for entity in &successes {
            output.push_str(&format!("  + {}\n", entity));
        }
        output.push_str(&format!("Failed ({}):\n", failures.len()));
        for line in &failures {
            output.push_str(&format!("  - {}\n", line));
        }

        if let Some(artifact) = &self.archive {
            output.push_str(&format!(
                "\nArchive: {} ({} file(s), {} -> {})\n",
                artifact.path.display(),
                artifact.file_count,
                format_size(artifact.source_bytes),
                format_size(artifact.size_bytes)
            ));
        }
        if let Some(error) = &self.archive_error {
            output.push_str(&format!("\nArchive FAILED: {}\n", error));
        }

        match &self.upload {
            UploadStatus::Uploaded { destination } => {
                output.push_str(&format!("Upload: {}\n", destination));
                output.push_str(&format!("Removed {} local file(s)\n", self.cleaned.len()));
            }
            UploadStatus::Failed { reason } => {
                output.push_str(&format!("Upload FAILED: {}\n", reason));
                output.push_str("Local files kept for manual recovery\n");
            }
            UploadStatus::NotAttempted(reason) => {
                output.push_str(&format!("Upload: skipped ({})\n", reason));
            }
        }
        if let Some(error) = &self.cleanup_error {
            output.push_str(&format!("Cleanup FAILED: {}\n", error));
        }

        output
    }
}

/// Format a file size in human-readable form
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
