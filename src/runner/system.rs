//! Process runner backed by `std::process::Command`

use std::fs::{self, File};
use std::process::{Command, Stdio};

use crate::command::CommandSpec;
use crate::error::{PgBatchError, PgBatchResult};
use crate::models::{ExecutionOutcome, Secret};

use super::{truncate_diagnostic, ProcessRunner};

/// Spawns the external tool directly, without a shell
#[derive(Debug, Clone)]
pub struct SystemRunner {
    max_diagnostic_chars: usize,
}

impl SystemRunner {
    pub fn new(max_diagnostic_chars: usize) -> Self {
        Self {
            max_diagnostic_chars,
        }
    }

    /// Run the command, returning `ExternalToolFailure` on a non-zero exit
    pub fn execute(&self, spec: &CommandSpec, secret: &Secret) -> PgBatchResult<()> {
        fs::create_dir_all(&spec.working_dir).map_err(|e| {
            PgBatchError::Io(format!(
                "Failed to create working directory {}: {}",
                spec.working_dir.display(),
                e
            ))
        })?;

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .current_dir(&spec.working_dir)
            // Overlay on a copy of the inherited environment; ours is untouched.
            .env(spec.secret_var, secret.expose())
            .stdin(Stdio::null())
            .stderr(Stdio::piped());

        match &spec.stdout_target {
            Some(target) => {
                let path = spec.working_dir.join(target);
                let file = File::create(&path).map_err(|e| {
                    PgBatchError::Io(format!("Failed to create {}: {}", path.display(), e))
                })?;
                command.stdout(Stdio::from(file));
            }
            None => {
                command.stdout(Stdio::piped());
            }
        }

        let output = command.output().map_err(|e| {
            PgBatchError::Io(format!(
                "Failed to start {}: {}",
                spec.program.display(),
                e
            ))
        })?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Err(PgBatchError::ExternalToolFailure {
            exit_code: output.status.code(),
            stderr,
        })
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new(500)
    }
}

impl ProcessRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec, secret: &Secret) -> ExecutionOutcome {
        log::info!("{} started for user: {}", spec.program.display(), spec.entity);
        log::debug!("Running: {}", spec.display_line());

        match self.execute(spec, secret) {
            Ok(()) => {
                log::info!("Command for '{}' executed successfully", spec.entity);
                ExecutionOutcome::success(&spec.entity)
            }
            Err(PgBatchError::ExternalToolFailure { exit_code, stderr }) => {
                let diagnostic = if stderr.is_empty() {
                    match exit_code {
                        Some(code) => format!("exit status {}", code),
                        None => "terminated by signal".to_string(),
                    }
                } else {
                    stderr
                };
                log::error!(
                    "Command for '{}' failed with return code {:?}: {}",
                    spec.entity,
                    exit_code,
                    diagnostic
                );
                ExecutionOutcome::failure(
                    &spec.entity,
                    truncate_diagnostic(&diagnostic, self.max_diagnostic_chars),
                )
            }
            Err(e) => {
                log::error!("Command for '{}' could not run: {}", spec.entity, e);
                ExecutionOutcome::failure(
                    &spec.entity,
                    truncate_diagnostic(&e.to_string(), self.max_diagnostic_chars),
                )
            }
        }
    }
}
