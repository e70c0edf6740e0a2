//! Core types for sensor-export
//!
//! Job descriptors are value objects: the worker never mutates one in place,
//! successors are derived by copying every field and overriding the few that
//! change from one hop to the next.

use crate::error::{Error, Result};
use crate::retry::Backoff;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// One decoded message, augmented with `timestamp` and `topic`
pub type Record = serde_json::Value;

/// Queue priority of a submitted job
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Low priority
    Low,
    /// Normal priority
    #[default]
    Normal,
    /// Expedited scheduling
    High,
    /// Run before everything else
    Critical,
}

/// Type of a queued job
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    /// Fetch one page for the current identifier
    Download,
    /// Merge every per-identifier page file into the final artifact
    Stitch,
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobKind::Download => write!(f, "download"),
            JobKind::Stitch => write!(f, "stitch"),
        }
    }
}

/// Export options forwarded untouched to successors and to the stitch stage
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportOptions {
    /// Use temperature-compensated values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compensated: Option<serde_json::Value>,
    /// Use instantaneous rather than averaged values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instantaneous: Option<serde_json::Value>,
    /// Timezone offset applied when stitching
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utc_offset: Option<serde_json::Value>,
    /// Name of the archive produced downstream
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip_file_name: Option<serde_json::Value>,
    /// Output format of the stitch stage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stitch_format: Option<serde_json::Value>,
    /// Downstream stages to skip
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bypass_stages: Option<serde_json::Value>,
    /// Any other option the front end attached
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// A parsed identifier token of the form `<primary>[=<label>...]`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identifier {
    /// Component substituted into URL templates
    pub primary: String,
    /// Human-readable labels used for directory naming
    pub labels: Vec<String>,
}

impl Identifier {
    /// Split a raw token on `=`
    pub fn parse(token: &str) -> Self {
        let mut parts = token.split('=');
        let primary = parts.next().unwrap_or_default().to_string();
        Self {
            primary,
            labels: parts.map(str::to_string).collect(),
        }
    }
}

/// One unit of work for the `download` job type
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobDescriptor {
    /// Human-readable description shown by the queue
    #[serde(default)]
    pub title: String,
    /// Identifiers left to process; the first one is current
    #[serde(alias = "serials")]
    pub identifiers: Vec<String>,
    /// Every identifier of the export run, in order
    #[serde(alias = "original_serials")]
    pub original_identifiers: Vec<String>,
    /// URL of the page to fetch, still containing the placeholder
    pub url: String,
    /// Template URL pagination restarts from for a fresh identifier
    pub original_url: String,
    /// Root output directory of the run
    pub save_path: PathBuf,
    /// 1-based page counter within the current identifier
    pub sequence: u64,
    /// Requesting user, opaque to the worker
    #[serde(default)]
    pub user_id: Option<serde_json::Value>,
    /// Address notified once the export is ready, opaque to the worker
    #[serde(default)]
    pub email: Option<serde_json::Value>,
    /// Pass-through export options
    #[serde(default)]
    pub options: ExportOptions,
}

impl JobDescriptor {
    /// Reject descriptors the worker cannot act on
    pub fn validate(&self) -> Result<()> {
        if self.identifiers.is_empty() {
            return Err(Error::InvalidJob("no identifiers left to process".into()));
        }
        if self.sequence == 0 {
            return Err(Error::InvalidJob("sequence is 1-based".into()));
        }
        if !self.original_identifiers.ends_with(&self.identifiers) {
            return Err(Error::InvalidJob(
                "identifiers are not a suffix of original_identifiers".into(),
            ));
        }
        Ok(())
    }

    /// The identifier this job fetches pages for
    pub fn current(&self) -> Result<Identifier> {
        self.identifiers
            .first()
            .map(|token| Identifier::parse(token))
            .ok_or_else(|| Error::InvalidJob("no identifiers left to process".into()))
    }

    /// Successor that fetches the next page of the same identifier
    pub fn continue_with(&self, url: String) -> Self {
        Self {
            title: format!("downloading url {url}"),
            url,
            sequence: self.sequence + 1,
            ..self.clone()
        }
    }

    /// Successor that starts pagination for the next identifier, if any is left
    pub fn for_next_identifier(&self) -> Option<Self> {
        let remaining = self.identifiers.get(1..)?;
        let next = remaining.first()?;
        Some(Self {
            title: format!("downloading url {} for {next}", self.original_url),
            identifiers: remaining.to_vec(),
            url: self.original_url.clone(),
            sequence: 1,
            ..self.clone()
        })
    }
}

/// Payload of the terminal `stitch` handoff
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StitchDescriptor {
    /// Human-readable description shown by the queue
    pub title: String,
    /// Root output directory of the run
    pub save_path: PathBuf,
    /// Every identifier of the export run, in order
    pub original_identifiers: Vec<String>,
    /// Template URL of the run
    pub original_url: String,
    /// Per-identifier directories found under `save_path`
    pub identifiers: Vec<String>,
    /// Requesting user, opaque to the worker
    pub user_id: Option<serde_json::Value>,
    /// Address notified once the export is ready, opaque to the worker
    pub email: Option<serde_json::Value>,
    /// Pass-through export options
    pub options: ExportOptions,
}

/// Job payload, tagged with its job type
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum JobPayload {
    /// Continuation or next-identifier fetch
    Download(JobDescriptor),
    /// Terminal merge trigger
    Stitch(StitchDescriptor),
}

impl JobPayload {
    /// Job type the queue should file this payload under
    pub fn kind(&self) -> JobKind {
        match self {
            JobPayload::Download(_) => JobKind::Download,
            JobPayload::Stitch(_) => JobKind::Stitch,
        }
    }

    /// Title of the wrapped descriptor
    pub fn title(&self) -> &str {
        match self {
            JobPayload::Download(job) => &job.title,
            JobPayload::Stitch(job) => &job.title,
        }
    }
}

/// A job handed to the queue collaborator for durable storage
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewJob {
    /// What to run
    pub payload: JobPayload,
    /// Scheduling priority
    pub priority: Priority,
    /// Maximum number of attempts
    pub attempts: u32,
    /// Delay policy between attempts, if the job is retried at all
    pub backoff: Option<Backoff>,
}

impl NewJob {
    /// Job type of the payload
    pub fn kind(&self) -> JobKind {
        self.payload.kind()
    }
}

/// Progress flag persisted at the root of every run directory
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMarker {
    /// Set by the stitch stage once the export is finished
    pub complete: bool,
}

/// Response body of one page request
///
/// Messages stay untyped here: a single message with an unexpected shape must
/// only lose that message, never the page.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ApiPage {
    /// Messages of this page; absence is a contract violation
    #[serde(default)]
    pub messages: Option<Vec<serde_json::Value>>,
    /// Path of the next page, relative to the API origin
    #[serde(default)]
    pub next: Option<String>,
}
