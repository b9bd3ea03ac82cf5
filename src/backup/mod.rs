//! Backup and restore runs for pgbatch
//!
//! # Architecture
//!
//! A run is assembled from these components:
//!
//! - `Orchestrator`: runs the external tool once per entity, in input order,
//!   and collects a `RunReport`; one failure never stops the others
//! - `Archiver`: packs the run's dump files into a single `.tar.gz`
//! - `Uploader`: copies the archive to object storage
//! - `RetentionPolicy`: removes local dumps and archives after a confirmed upload
//! - `Pipeline`: sequences the above and dispatches the notification
//!
//! # Example
//!
//! ```rust,ignore
//! use pgbatch::backup::Pipeline;
//! use pgbatch::config::{read_properties_file, Settings};
//! use pgbatch::models::{Mode, RunStamp};
//! use pgbatch::runner::SystemRunner;
//!
//! let settings = Settings::default();
//! let properties = read_properties_file(path)?;
//! let runner = SystemRunner::new(settings.max_diagnostic_chars);
//! let summary = Pipeline::new(&settings, &runner)
//!     .run(Mode::Backup, &properties, RunStamp::now(), |_| {})?;
//! println!("{}", summary.format_terminal());
//! ```

mod archive;
mod orchestrator;
mod pipeline;
mod retention;
mod upload;

pub use archive::{ArchiveArtifact, ArchiveProgress, Archiver, ARCHIVE_SUFFIX};
pub use orchestrator::Orchestrator;
pub use pipeline::{format_size, Pipeline, RunStatus, RunSummary, UploadStatus};
pub use retention::RetentionPolicy;
pub use upload::{CommandUploader, UploadResult, Uploader};
