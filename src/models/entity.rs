//! Records parsed from a properties file
//!
//! `SharedSettings` holds the server-wide keys shared by every entity in a
//! run. `EntityRecord` holds one tenant's database, credentials and, for
//! restores, the dump file to load.

use std::collections::BTreeMap;

use crate::error::{PgBatchError, PgBatchResult};

use super::secret::Secret;

/// Well-known property keys
pub mod keys {
    pub const PSQL_PATH: &str = "psql_path";
    pub const DATABASE_SERVER: &str = "database_server";
    pub const PORT: &str = "port";
    pub const FROM_USERNAME: &str = "from_username";
    pub const TO_USERNAME: &str = "to_username";

    pub const DB: &str = "db";
    pub const USERNAME: &str = "username";
    pub const PASSWORD: &str = "password";
    pub const RESTORE_FILENAME: &str = "restore_filename";
}

/// Server-wide settings shared read-only by every entity in a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SharedSettings {
    values: BTreeMap<String, String>,
}

impl SharedSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value; a repeated key overwrites the earlier one
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Look up a key that must be present
    pub fn require(&self, key: &str) -> PgBatchResult<&str> {
        self.get(key).ok_or_else(|| PgBatchError::missing_key(key))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SharedSettings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut settings = Self::new();
        for (key, value) in iter {
            settings.insert(key, value);
        }
        settings
    }
}

/// One tenant database to back up or restore
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRecord {
    /// 1-based line number in the properties file
    line: usize,
    fields: BTreeMap<String, String>,
    password: Option<Secret>,
}

impl EntityRecord {
    /// Create a record from its parsed fields
    ///
    /// The `password` field, if present, is moved out of the plain map and
    /// kept as a [`Secret`].
    pub fn new(line: usize, mut fields: BTreeMap<String, String>) -> Self {
        let password = fields.remove(keys::PASSWORD).map(Secret::from);
        Self {
            line,
            fields,
            password,
        }
    }

    pub fn line(&self) -> usize {
        self.line
    }

    /// Look up a non-secret field
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Look up a non-secret field that must be present
    pub fn require(&self, key: &str) -> PgBatchResult<&str> {
        self.get(key).ok_or_else(|| PgBatchError::missing_key(key))
    }

    pub fn database(&self) -> PgBatchResult<&str> {
        self.require(keys::DB)
    }

    pub fn username(&self) -> PgBatchResult<&str> {
        self.require(keys::USERNAME)
    }

    pub fn password(&self) -> PgBatchResult<&Secret> {
        self.password
            .as_ref()
            .ok_or_else(|| PgBatchError::missing_key(keys::PASSWORD))
    }

    pub fn restore_filename(&self) -> PgBatchResult<&str> {
        self.require(keys::RESTORE_FILENAME)
    }

    /// Identifier used in logs and reports
    ///
    /// Falls back to the database name, then the line number, so that a
    /// record missing its username can still be reported.
    pub fn id(&self) -> String {
        self.get(keys::USERNAME)
            .or_else(|| self.get(keys::DB))
            .map(str::to_string)
            .unwrap_or_else(|| format!("line {}", self.line))
    }
}
