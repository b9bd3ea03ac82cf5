//! Builds the external tool invocation for one entity
//!
//! Building is pure: the same settings, entity, stamp and working directory
//! always produce the same `CommandSpec`. Nothing is executed here.

use std::path::{Path, PathBuf};

use crate::error::PgBatchResult;
use crate::models::{keys, EntityRecord, Mode, RunStamp, SharedSettings};

/// Environment variable the database password is passed through
pub const SECRET_ENV_VAR: &str = "PGPASSWORD";

const DUMP_TOOL: &str = "pg_dump";
const RESTORE_TOOL: &str = "psql";

/// A fully resolved external tool invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Entity id the command belongs to
    pub entity: String,
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    /// File (relative to `working_dir`) that receives stdout
    pub stdout_target: Option<PathBuf>,
    /// Environment variable the secret is injected through
    pub secret_var: &'static str,
}

impl CommandSpec {
    /// Program and arguments joined for logging; contains no secrets
    pub fn display_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        if let Some(target) = &self.stdout_target {
            line.push_str(" > ");
            line.push_str(&target.display().to_string());
        }
        line
    }
}

/// Build the invocation for one entity
pub fn build_command(
    mode: Mode,
    shared: &SharedSettings,
    entity: &EntityRecord,
    stamp: &RunStamp,
    working_dir: &Path,
) -> PgBatchResult<CommandSpec> {
    let prefix = shared.get(keys::PSQL_PATH).unwrap_or("");
    let host = shared.require(keys::DATABASE_SERVER)?;
    let port = shared.require(keys::PORT)?;
    let database = entity.database()?;
    let username = entity.username()?;

    let mut args = vec![
        "-h".to_string(),
        host.to_string(),
        "-d".to_string(),
        database.to_string(),
        "--username".to_string(),
        username.to_string(),
        "--port".to_string(),
        port.to_string(),
    ];

    let (tool, stdout_target) = match mode {
        Mode::Backup => {
            args.extend([
                "--no-owner".to_string(),
                "--schema".to_string(),
                username.to_string(),
            ]);
            (DUMP_TOOL, Some(dump_file_name(username, stamp)))
        }
        Mode::Restore => {
            // The tool runs inside `working_dir`, so relative names stay relative
            args.extend(["-f".to_string(), entity.restore_filename()?.to_string()]);
            (RESTORE_TOOL, None)
        }
    };

    Ok(CommandSpec {
        entity: entity.id(),
        program: PathBuf::from(format!("{}{}", prefix, tool)),
        args,
        working_dir: working_dir.to_path_buf(),
        stdout_target,
        secret_var: SECRET_ENV_VAR,
    })
}

/// `{username}_{stamp}.sql`
pub fn dump_file_name(username: &str, stamp: &RunStamp) -> PathBuf {
    PathBuf::from(format!("{}_{}.sql", username, stamp))
}

/// Where a restore file lives as seen from this process
///
/// Relative names live in the restore directory.
pub fn resolve_restore_file(filename: &str, working_dir: &Path) -> PathBuf {
    let path = Path::new(filename);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        working_dir.join(path)
    }
}
