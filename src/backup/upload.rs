//! Upload of a run's archive to object storage

use std::process::{Command, Stdio};

use crate::config::UploadSettings;
use crate::error::{PgBatchError, PgBatchResult};

use super::archive::ArchiveArtifact;

/// Outcome of an upload attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadResult {
    Uploaded { destination: String },
    Failed { reason: String },
}

impl UploadResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Uploaded { .. })
    }
}

/// Stores an archive somewhere off the machine
pub trait Uploader {
    fn upload(&self, artifact: &ArchiveArtifact) -> UploadResult;
}

/// Uploads by running a copy tool such as `aws s3 cp`
#[derive(Debug, Clone)]
pub struct CommandUploader {
    program: String,
    args: Vec<String>,
    storage_prefix: String,
}

impl CommandUploader {
    pub fn new(
        program: impl Into<String>,
        args: Vec<String>,
        storage_prefix: impl Into<String>,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            storage_prefix: storage_prefix.into(),
        }
    }

    pub fn from_settings(settings: &UploadSettings) -> Self {
        Self::new(
            settings.program.clone(),
            settings.args.clone(),
            settings.storage_prefix.clone(),
        )
    }

    /// `{storage_prefix}/{archive file name}`
    pub fn destination(&self, artifact: &ArchiveArtifact) -> String {
        format!(
            "{}/{}",
            self.storage_prefix.trim_end_matches('/'),
            artifact.file_name()
        )
    }

    /// Run the upload tool, returning `Upload` on any failure
    pub fn execute(&self, artifact: &ArchiveArtifact) -> PgBatchResult<String> {
        let destination = self.destination(artifact);

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(&artifact.path)
            .arg(&destination)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| PgBatchError::Upload(format!("Failed to start {}: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(PgBatchError::Upload(match output.status.code() {
                Some(code) if stderr.is_empty() => format!("{} exited with {}", self.program, code),
                Some(code) => format!("{} exited with {}: {}", self.program, code, stderr),
                None => format!("{} terminated by signal", self.program),
            }));
        }

        Ok(destination)
    }
}

impl Uploader for CommandUploader {
    fn upload(&self, artifact: &ArchiveArtifact) -> UploadResult {
        log::info!("Uploading {} to {}", artifact.path.display(), self.storage_prefix);
        match self.execute(artifact) {
            Ok(destination) => {
                log::info!("Upload complete: {}", destination);
                UploadResult::Uploaded { destination }
            }
            Err(e) => {
                log::error!("{}", e);
                UploadResult::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}
