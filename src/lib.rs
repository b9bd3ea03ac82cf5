//! pgbatch - per-tenant PostgreSQL backup and restore orchestrator
//!
//! Given a properties file describing one database server and a list of
//! tenant credentials, pgbatch drives `pg_dump` (or `psql` for restores) once
//! per tenant, records which tenants succeeded, archives and uploads the
//! dumps, and mails a single consolidated report.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Config paths, operator settings and the properties parser
//! - `error`: Custom error types
//! - `models`: Entity records, secrets, run stamp and run report
//! - `command`: External tool invocation building
//! - `runner`: Process execution
//! - `backup`: Entity loop, archive, upload, retention and the run pipeline
//! - `reports`: Notification rendering and dispatch
//! - `cli`: Command handlers
//!
//! # Example
//!
//! ```rust,ignore
//! use pgbatch::config::{paths::BatchPaths, settings::Settings};
//!
//! let paths = BatchPaths::new()?;
//! let settings = Settings::load_or_create(&paths)?;
//! ```

pub mod backup;
pub mod cli;
pub mod command;
pub mod config;
pub mod error;
pub mod models;
pub mod reports;
pub mod runner;

pub use error::PgBatchError;
