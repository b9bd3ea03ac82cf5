//! Run reporting
//!
//! Renders a finished run's report into a mail notification and hands it to
//! a transport. Reporting is best-effort and never changes a run's result.

pub mod dispatch;
pub mod notification;

pub use dispatch::{deliver, Notifier, SendmailNotifier};
pub use notification::{render_notification, subject_for, Notification};
