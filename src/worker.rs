//! Fetch-and-dispatch orchestration for `download` jobs
//!
//! One call to [`DownloadWorker::process`] handles exactly one job: it fetches
//! a single page, persists it, and submits at most one successor. The chain of
//! pages and identifiers advances only through the queue, never through
//! in-process loops, so every invocation starts from the descriptor alone.

use crate::client::ApiClient;
use crate::config::Config;
use crate::continuation::{ContinuationPolicy, Decision};
use crate::error::{Error, Result, body_snippet};
use crate::identifiers::{Advance, advance};
use crate::paths::{directory_for, ensure_dir};
use crate::payload::decode_page;
use crate::queue::{JobQueue, SubmitPolicy};
use crate::retry::IsRetryable;
use crate::types::{JobDescriptor, NewJob};
use crate::writer::{ensure_run_root, write_page};
use std::path::PathBuf;
use std::sync::Arc;

/// Which successor an invocation submitted
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Successor {
    /// Next page of the same identifier
    Continued,
    /// First page of the next identifier
    NextIdentifier,
    /// Stitch handoff for the whole run
    Handoff,
}

/// Result payload reported to the queue for a successful invocation
#[derive(Clone, Debug)]
pub struct JobReport {
    /// Page file written, absent when the identifier had no data (404)
    pub page_path: Option<PathBuf>,
    /// Number of records in the page
    pub records: usize,
    /// Kind of successor submitted
    pub successor: Successor,
    /// The submitted successor job
    pub next_job: NewJob,
}

/// Worker for the `download` job type
pub struct DownloadWorker {
    client: ApiClient,
    policy: ContinuationPolicy,
    submit: SubmitPolicy,
    queue: Arc<dyn JobQueue>,
}

impl DownloadWorker {
    /// Create a worker submitting successors to `queue`
    pub fn new(config: Config, queue: Arc<dyn JobQueue>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            client: ApiClient::new(&config.api)?,
            policy: ContinuationPolicy::from_config(&config)?,
            submit: SubmitPolicy::new(config.jobs),
            queue,
        })
    }

    /// Run one `download` job
    ///
    /// `Ok` means the page (if any) is on disk and exactly one successor has
    /// been submitted. `Err` means no successor was submitted and the queue's
    /// retry policy decides what happens to the job.
    pub async fn process(&self, job: &JobDescriptor) -> Result<JobReport> {
        match self.try_process(job).await {
            Ok(report) => {
                tracing::info!(
                    identifier = %job.identifiers[0],
                    sequence = job.sequence,
                    records = report.records,
                    successor = ?report.successor,
                    "download job complete"
                );
                Ok(report)
            }
            Err(e) => {
                tracing::error!(
                    url = %job.url,
                    sequence = job.sequence,
                    error = %e,
                    retryable = e.is_retryable(),
                    "download job failed"
                );
                Err(e)
            }
        }
    }

    async fn try_process(&self, job: &JobDescriptor) -> Result<JobReport> {
        job.validate()?;
        ensure_run_root(&job.save_path).await?;

        let url = self.policy.request_url(job)?;
        let response = self.client.get(&url).await?;

        let (page, continue_to) = match self.policy.decide_next(&response, job) {
            Decision::TransientRetry(delay) => {
                tracing::warn!(
                    url = %url,
                    status = response.status,
                    body = %body_snippet(&response.body),
                    delay_secs = delay.as_secs(),
                    "transient API failure, delaying before reporting"
                );
                tokio::time::sleep(delay).await;
                return Err(Error::TransientUpstream {
                    status: response.status,
                    url,
                });
            }
            Decision::Fatal(e) => return Err(e),
            Decision::Continue { page, next_url } => (Some(page), Some(next_url)),
            Decision::ExhaustedIdentifier { page } => (page, None),
        };

        let (page_path, records) = match page {
            Some(page) => {
                let dir = directory_for(&job.identifiers[0], &job.save_path);
                ensure_dir(&dir).await?;
                let records = decode_page(page.messages.as_deref().unwrap_or_default());
                let path = write_page(&dir, job.sequence, &records).await?;
                (Some(path), records.len())
            }
            None => (None, 0),
        };

        let (next_job, successor) = match continue_to {
            Some(next_url) => (
                self.submit.download(job.continue_with(next_url)),
                Successor::Continued,
            ),
            None => match advance(job).await? {
                Advance::NextIdentifier(next) => {
                    (self.submit.download(next), Successor::NextIdentifier)
                }
                Advance::Handoff(stitch) => (self.submit.stitch(stitch), Successor::Handoff),
            },
        };

        self.queue.submit(next_job.clone()).await?;

        Ok(JobReport {
            page_path,
            records,
            successor,
            next_job,
        })
    }
}
