//! Configuration module for pgbatch
//!
//! This module provides configuration management including:
//! - Config directory resolution
//! - Operator settings persistence
//! - Per-run properties file parsing

pub mod paths;
pub mod properties;
pub mod settings;

pub use paths::BatchPaths;
pub use properties::{parse_properties, read_properties_file, Properties};
pub use settings::{NotificationSettings, Settings, UploadSettings};
