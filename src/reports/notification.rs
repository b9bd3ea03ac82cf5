//! Run notification rendering
//!
//! Turns a `RunReport` into an HTML mail listing which databases succeeded
//! and which failed.

use crate::config::NotificationSettings;
use crate::models::RunReport;

/// A rendered notification ready for dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub sender: String,
    pub recipient: String,
    pub subject: String,
    pub html_body: String,
}

impl Notification {
    /// RFC 5322 message text as handed to a sendmail-compatible transport
    pub fn to_message(&self) -> String {
        format!(
            "From: {}\r\nTo: {}\r\nSubject: {}\r\nMIME-Version: 1.0\r\n\
             Content-Type: text/html; charset=utf-8\r\n\r\n{}\r\n",
            self.sender, self.recipient, self.subject, self.html_body
        )
    }
}

/// Build the notification for a finished run
pub fn render_notification(report: &RunReport, settings: &NotificationSettings) -> Notification {
    Notification {
        sender: settings.sender.clone(),
        recipient: settings.recipient.clone(),
        subject: subject_for(report, &settings.subject_prefix),
        html_body: render_html(report),
    }
}

/// Subject line; any failure makes it a failure subject
pub fn subject_for(report: &RunReport, prefix: &str) -> String {
    let total = report.len();
    let failed = report.failure_count();
    let body = if failed > 0 {
        format!(
            "{} failed for {} of {} database(s)",
            report.mode.label(),
            failed,
            total
        )
    } else {
        format!("{} succeeded for all {} database(s)", report.mode.label(), total)
    };

    if prefix.is_empty() {
        body
    } else {
        format!("{} {}", prefix, body)
    }
}

fn render_html(report: &RunReport) -> String {
    let mut html = String::from("<html><body>\n");

    let successes = report.successes();
    if !successes.is_empty() {
        html.push_str(&format!(
            "<p>{} succeeded for:</p>\n<ul>\n",
            report.mode.label()
        ));
        for entity in &successes {
            html.push_str(&format!(
                "<li style=\"color: green;\">{}</li>\n",
                escape_html(entity)
            ));
        }
        html.push_str("</ul>\n");
    }

    let failures = report.failures();
    if !failures.is_empty() {
        html.push_str(&format!(
            "<p>{} failed for:</p>\n<ul>\n",
            report.mode.label()
        ));
        for line in &failures {
            html.push_str(&format!(
                "<li style=\"color: red;\">{}</li>\n",
                escape_html(line)
            ));
        }
        html.push_str("</ul>\n");
    }

    if report.is_empty() {
        html.push_str("<p>No databases were configured for this run.</p>\n");
    }

    html.push_str("</body></html>");
    html
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
