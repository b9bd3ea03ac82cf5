//! Per-run models: the run mode, the shared run stamp, and the outcome report

use std::fmt;

use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};

use super::entity::keys;

/// Which external tool a run drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Backup,
    Restore,
}

impl Mode {
    /// Shared keys that must be present before any entity is attempted
    ///
    /// `psql_path` is optional; without it the tools are looked up on `PATH`.
    pub fn required_shared_keys(&self) -> &'static [&'static str] {
        &[keys::DATABASE_SERVER, keys::PORT]
    }

    /// Title-case label used in report subjects
    pub fn label(&self) -> &'static str {
        match self {
            Self::Backup => "Backup",
            Self::Restore => "Restore",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backup => write!(f, "backup"),
            Self::Restore => write!(f, "restore"),
        }
    }
}

/// A second-resolution timestamp fixed once per run
///
/// Every dump file and the archive of one run share this value, so a run
/// produces a coherent set of files.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunStamp(String);

impl RunStamp {
    pub const FORMAT: &'static str = "%Y%m%d.%H%M%S";

    /// Stamp for the current local time
    pub fn now() -> Self {
        Self::from_datetime(&Local::now())
    }

    pub fn from_datetime<Tz: TimeZone>(at: &DateTime<Tz>) -> Self
    where
        Tz::Offset: fmt::Display,
    {
        Self(at.format(Self::FORMAT).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of attempting one entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ExecutionOutcome {
    Success { entity: String },
    Failure { entity: String, diagnostic: String },
}

impl ExecutionOutcome {
    pub fn success(entity: impl Into<String>) -> Self {
        Self::Success {
            entity: entity.into(),
        }
    }

    pub fn failure(entity: impl Into<String>, diagnostic: impl Into<String>) -> Self {
        Self::Failure {
            entity: entity.into(),
            diagnostic: diagnostic.into(),
        }
    }

    pub fn entity(&self) -> &str {
        match self {
            Self::Success { entity } | Self::Failure { entity, .. } => entity,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Ordered outcomes of every entity in a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub mode: Mode,
    pub outcomes: Vec<ExecutionOutcome>,
}

impl RunReport {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            outcomes: Vec::new(),
        }
    }

    pub fn push(&mut self, outcome: ExecutionOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Entity ids that succeeded, in input order
    pub fn successes(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter(|o| o.is_success())
            .map(|o| o.entity().to_string())
            .collect()
    }

    /// `"{entity} - {diagnostic}"` lines for failed entities, in input order
    pub fn failures(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                ExecutionOutcome::Failure { entity, diagnostic } => {
                    Some(format!("{} - {}", entity, diagnostic))
                }
                ExecutionOutcome::Success { .. } => None,
            })
            .collect()
    }

    pub fn failure_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_success()).count()
    }

    pub fn has_failures(&self) -> bool {
        self.failure_count() > 0
    }
}
