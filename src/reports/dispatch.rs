//! Notification dispatch
//!
//! Delivery is best-effort: `deliver` logs transport failures and never
//! returns them, so a broken mail setup cannot mask a run's result.

use std::io::Write;
use std::process::{Command, Stdio};

use crate::config::NotificationSettings;
use crate::error::{PgBatchError, PgBatchResult};

use super::notification::Notification;

/// Sends a rendered notification
pub trait Notifier {
    fn dispatch(&self, notification: &Notification) -> PgBatchResult<()>;
}

/// Pipes the message into a sendmail-compatible program (`sendmail -t`)
#[derive(Debug, Clone)]
pub struct SendmailNotifier {
    program: String,
}

impl SendmailNotifier {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn from_settings(settings: &NotificationSettings) -> Self {
        Self::new(settings.transport_endpoint.clone())
    }
}

impl Notifier for SendmailNotifier {
    fn dispatch(&self, notification: &Notification) -> PgBatchResult<()> {
        let mut child = Command::new(&self.program)
            .arg("-t")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                PgBatchError::NotificationDispatch(format!(
                    "Failed to start {}: {}",
                    self.program, e
                ))
            })?;

        // Stdin is dropped before waiting so the child sees EOF
        let write_result = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(notification.to_message().as_bytes()),
            None => Ok(()),
        };

        // Always reap the child, even when it stopped reading early
        let output = child.wait_with_output().map_err(|e| {
            PgBatchError::NotificationDispatch(format!("Failed to wait for {}: {}", self.program, e))
        });

        write_result.map_err(|e| {
            PgBatchError::NotificationDispatch(format!("Failed to write message: {}", e))
        })?;
        let output = output?;

        if !output.status.success() {
            return Err(PgBatchError::NotificationDispatch(format!(
                "{} exited with {:?}: {}",
                self.program,
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(())
    }
}

/// Dispatch a notification, logging instead of propagating failures
///
/// Returns whether the notification was handed off.
pub fn deliver(notifier: &dyn Notifier, notification: &Notification) -> bool {
    match notifier.dispatch(notification) {
        Ok(()) => {
            log::info!(
                "Notification '{}' sent to {}",
                notification.subject,
                notification.recipient
            );
            true
        }
        Err(e) => {
            log::error!("{}", e);
            false
        }
    }
}
