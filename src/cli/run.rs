//! Backup and restore CLI commands
//!
//! Wires the operator settings to the real process runner, uploader and
//! mail transport, then runs the pipeline for one properties file.

use std::path::Path;

use crate::backup::{CommandUploader, Pipeline, RunStatus, Uploader};
use crate::config::{read_properties_file, Settings};
use crate::error::PgBatchResult;
use crate::models::{Mode, RunStamp};
use crate::reports::{Notifier, SendmailNotifier};
use crate::runner::SystemRunner;

/// Handle `pgbatch backup <CONFIG>` and `pgbatch restore <CONFIG>`
pub fn handle_run_command(
    settings: &Settings,
    mode: Mode,
    config_path: &Path,
) -> PgBatchResult<RunStatus> {
    let properties = read_properties_file(config_path)?;
    log::info!(
        "Loaded {} database(s) from {}",
        properties.entities.len(),
        config_path.display()
    );

    // Fixed once so every file of this run shares it.
    let stamp = RunStamp::now();

    let runner = SystemRunner::new(settings.max_diagnostic_chars);
    let uploader = settings.upload.as_ref().map(CommandUploader::from_settings);
    let notifier = settings
        .notification
        .as_ref()
        .map(SendmailNotifier::from_settings);

    let mut pipeline = Pipeline::new(settings, &runner);
    if let Some(uploader) = &uploader {
        pipeline = pipeline.with_uploader(uploader as &dyn Uploader);
    }
    if let Some(notifier) = &notifier {
        pipeline = pipeline.with_notifier(notifier as &dyn Notifier);
    }

    let mut last_decile = None;
    let summary = pipeline.run(mode, &properties, stamp, |progress| {
        let decile = (progress.fraction() * 10.0).floor() as u8;
        if last_decile != Some(decile) {
            last_decile = Some(decile);
            log::info!(
                "Archiving: {:.0}% ({} of {} bytes)",
                progress.fraction() * 100.0,
                progress.bytes_added,
                progress.total_bytes
            );
        }
    })?;

    println!("{}", summary.format_terminal());

    let status = summary.status();
    if !status.is_clean() {
        log::warn!("{} finished with status {:?}", mode, status);
    }
    Ok(status)
}
