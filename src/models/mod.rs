//! Core data models for pgbatch
//!
//! This module contains the data structures shared across the pipeline:
//! parsed properties, secrets, the run stamp and the run report.

pub mod entity;
pub mod run;
pub mod secret;

pub use entity::{keys, EntityRecord, SharedSettings};
pub use run::{ExecutionOutcome, Mode, RunReport, RunStamp};
pub use secret::Secret;
