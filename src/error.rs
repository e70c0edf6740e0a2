//! Error types for sensor-export
//!
//! Every failure the download worker can report back to its queue is a variant
//! of [`Error`]. Upstream failures carry the status code, the URL and a snippet
//! of the response body so a failed job can be diagnosed without re-running it.

use thiserror::Error;

/// Result type alias for sensor-export operations
pub type Result<T> = std::result::Result<T, Error>;

/// Maximum number of response body characters embedded in an error
const BODY_SNIPPET_LEN: usize = 512;

/// Main error type for sensor-export
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "api.base_url")
        key: Option<String>,
    },

    /// The job descriptor handed to the worker is unusable
    #[error("invalid job: {0}")]
    InvalidJob(String),

    /// I/O error while creating directories or writing pages
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport-level failure (connection refused, timeout, TLS, ...)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A URL (template, cursor or base origin) could not be parsed
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The API answered with a status that cannot be recovered by waiting
    #[error("API returned status code {status} for {url}, with body {body}")]
    UpstreamStatus {
        /// HTTP status code
        status: u16,
        /// Requested URL
        url: String,
        /// Truncated response body
        body: String,
    },

    /// The API answered 200 but the body does not match the expected contract
    #[error("API returned a malformed body for {url}: {reason}")]
    MalformedResponse {
        /// Requested URL
        url: String,
        /// What was wrong with the body
        reason: String,
    },

    /// The API rejected the request in a way that usually clears up on its own
    #[error("API returned transient status {status} for {url}")]
    TransientUpstream {
        /// HTTP status code
        status: u16,
        /// Requested URL
        url: String,
    },

    /// The queue collaborator refused a successor job
    #[error("queue error: {0}")]
    Queue(String),
}

impl Error {
    /// Build an [`Error::UpstreamStatus`], truncating the body to a snippet
    pub fn upstream_status(status: u16, url: impl Into<String>, body: &str) -> Self {
        Error::UpstreamStatus {
            status,
            url: url.into(),
            body: body_snippet(body),
        }
    }

    /// Build a configuration error for the given key
    pub fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }
}

/// Truncate a response body so it can be embedded in logs and errors
pub fn body_snippet(body: &str) -> String {
    match body.char_indices().nth(BODY_SNIPPET_LEN) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
