//! # sensor-export
//!
//! Download stage of a multi-stage sensor data export pipeline.
//!
//! A `download` job names a list of device identifiers, a templated page URL
//! and an output directory. Each invocation fetches one page for the first
//! identifier, repairs and writes it to disk, and submits exactly one
//! successor to the job queue:
//!
//! - another `download` job for the next page of the same identifier
//! - a `download` job restarting pagination for the next identifier
//! - a `stitch` job once every identifier has been exhausted
//!
//! The queue runtime itself is a collaborator behind the [`JobQueue`] trait.
//!
//! ## Quick Start
//!
//! ```no_run
//! use sensor_export::{Config, DownloadWorker, JobDescriptor, MemoryQueue};
//! use std::sync::Arc;
//!
//! # async fn example(job: JobDescriptor) -> sensor_export::Result<()> {
//! let config = Config::from_json(r#"{"api": {"api_key": "secret"}}"#)?;
//! let queue = Arc::new(MemoryQueue::new());
//! let worker = DownloadWorker::new(config, queue.clone())?;
//!
//! let report = worker.process(&job).await?;
//! println!("wrote {} records, next: {:?}", report.records, report.successor);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Remote API client
pub mod client;
/// Configuration types
pub mod config;
/// Pagination decisions
pub mod continuation;
/// Error types
pub mod error;
/// Identifier iteration
pub mod identifiers;
/// Output directory naming
pub mod paths;
/// Payload repair and decoding
pub mod payload;
/// Job queue collaborator interface
pub mod queue;
/// Retry classification and backoff policies
pub mod retry;
/// Placeholder templating for job URLs
pub mod template;
/// Core types
pub mod types;
/// Fetch-and-dispatch worker
pub mod worker;
/// Page and status marker persistence
pub mod writer;

// Re-export commonly used types
pub use config::{ApiConfig, Config, JobPolicyConfig};
pub use continuation::{Continuation, ContinuationPolicy, Decision};
pub use error::{Error, Result};
pub use identifiers::Advance;
pub use queue::{JobQueue, MemoryQueue, SubmitPolicy};
pub use retry::{Backoff, BackoffKind, IsRetryable};
pub use types::{
    ExportOptions, Identifier, JobDescriptor, JobKind, JobPayload, NewJob, Priority, Record,
    StatusMarker, StitchDescriptor,
};
pub use worker::{DownloadWorker, JobReport, Successor};
