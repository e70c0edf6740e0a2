//! Job queue collaborator interface
//!
//! The worker depends on a single capability of the queue runtime: durably
//! storing a new job. Scheduling, priority ordering and retries stay on the
//! queue's side.

use crate::config::JobPolicyConfig;
use crate::error::{Error, Result};
use crate::retry::Backoff;
use crate::types::{JobDescriptor, JobPayload, NewJob, StitchDescriptor};
use async_trait::async_trait;
use std::sync::Mutex;

/// Queue runtime the worker submits successor jobs to
///
/// `submit` must not return before the job is durably stored: the worker
/// reports success for the current invocation right after it returns.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Persist a new job
    async fn submit(&self, job: NewJob) -> Result<()>;
}

/// Builds successor jobs with the configured attempt and backoff budgets
#[derive(Clone, Debug)]
pub struct SubmitPolicy {
    config: JobPolicyConfig,
}

impl SubmitPolicy {
    /// Create a policy from the job configuration
    pub fn new(config: JobPolicyConfig) -> Self {
        Self { config }
    }

    /// Continuation or next-identifier job: bounded attempts, exponential backoff
    pub fn download(&self, job: JobDescriptor) -> NewJob {
        NewJob {
            payload: JobPayload::Download(job),
            priority: self.config.priority,
            attempts: self.config.download_attempts,
            backoff: Some(Backoff::exponential(self.config.download_backoff)),
        }
    }

    /// Terminal merge trigger: never retried
    pub fn stitch(&self, job: StitchDescriptor) -> NewJob {
        NewJob {
            payload: JobPayload::Stitch(job),
            priority: self.config.priority,
            attempts: self.config.stitch_attempts,
            backoff: None,
        }
    }
}

/// In-process queue that records submitted jobs
///
/// Useful for embedding the worker behind a runtime that drains jobs itself,
/// and as a fake in tests.
#[derive(Debug, Default)]
pub struct MemoryQueue {
    jobs: Mutex<Vec<NewJob>>,
}

impl MemoryQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Jobs submitted so far, oldest first
    pub fn jobs(&self) -> Vec<NewJob> {
        self.jobs
            .lock()
            .map(|jobs| jobs.clone())
            .unwrap_or_default()
    }

    /// Remove and return every submitted job
    pub fn drain(&self) -> Vec<NewJob> {
        self.jobs
            .lock()
            .map(|mut jobs| std::mem::take(&mut *jobs))
            .unwrap_or_default()
    }
}

#[async_trait]
impl JobQueue for MemoryQueue {
    async fn submit(&self, job: NewJob) -> Result<()> {
        let mut jobs = self
            .jobs
            .lock()
            .map_err(|_| Error::Queue("memory queue lock poisoned".into()))?;
        tracing::debug!(kind = %job.kind(), title = %job.payload.title(), "job submitted");
        jobs.push(job);
        Ok(())
    }
}
