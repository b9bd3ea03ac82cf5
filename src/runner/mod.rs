//! Execution of external tool invocations
//!
//! `ProcessRunner` is the seam between the orchestrator and the operating
//! system. `SystemRunner` spawns real processes; tests substitute fakes.

mod system;

pub use system::SystemRunner;

use crate::command::CommandSpec;
use crate::models::{ExecutionOutcome, Secret};

/// Runs one command and classifies how it ended
pub trait ProcessRunner: Sync {
    /// Run `spec` with `secret` exposed through `spec.secret_var`
    ///
    /// Never fails: any spawn or exit error becomes a `Failure` outcome.
    fn run(&self, spec: &CommandSpec, secret: &Secret) -> ExecutionOutcome;
}

/// Truncate a diagnostic to at most `max_chars` characters
///
/// Truncated text ends with `...`. Cuts on a character boundary.
pub fn truncate_diagnostic(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let keep = max_chars.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}
