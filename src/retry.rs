//! Retry classification and backoff policies
//!
//! The worker never retries in-process: a failed invocation is reported to the
//! queue, which re-runs the same job according to the [`Backoff`] the job was
//! submitted with. This module holds the pieces both sides agree on.
//!
//! # Example
//!
//! ```
//! use sensor_export::retry::{Backoff, BackoffKind};
//! use std::time::Duration;
//!
//! let backoff = Backoff::exponential(Duration::from_secs(60));
//! assert_eq!(backoff.delay_for_attempt(1), Duration::from_secs(60));
//! assert_eq!(backoff.delay_for_attempt(3), Duration::from_secs(240));
//! assert_eq!(backoff.kind, BackoffKind::Exponential);
//! ```

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (timeouts, upstream throttling) should return `true`.
/// Permanent failures (bad configuration, malformed jobs) should return `false`.
pub trait IsRetryable {
    /// Returns true if re-running the same job may succeed
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            // Connection and timeout failures usually clear up
            Error::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Error::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::WouldBlock
            ),
            Error::TransientUpstream { .. } => true,
            // 5xx may recover, 4xx will not
            Error::UpstreamStatus { status, .. } => *status >= 500,
            // The API sometimes truncates bodies under load
            Error::MalformedResponse { .. } => true,
            Error::Queue(_) => true,
            Error::Config { .. } => false,
            Error::InvalidJob(_) => false,
            Error::InvalidUrl(_) => false,
            Error::Serialization(_) => false,
        }
    }
}

/// How the delay grows between attempts
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    /// Same delay before every attempt
    Fixed,
    /// Delay doubles after every attempt
    Exponential,
}

/// Backoff policy attached to a submitted job
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backoff {
    /// Growth strategy
    #[serde(rename = "type")]
    pub kind: BackoffKind,
    /// Base delay
    #[serde(with = "crate::config::duration_millis_serde")]
    pub delay: Duration,
}

impl Backoff {
    /// Fixed backoff with the given delay
    pub fn fixed(delay: Duration) -> Self {
        Self {
            kind: BackoffKind::Fixed,
            delay,
        }
    }

    /// Exponential backoff starting at the given delay
    pub fn exponential(delay: Duration) -> Self {
        Self {
            kind: BackoffKind::Exponential,
            delay,
        }
    }

    /// Delay before the given retry (1-based)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match self.kind {
            BackoffKind::Fixed => self.delay,
            BackoffKind::Exponential => {
                let exponent = attempt.saturating_sub(1).min(31);
                self.delay.saturating_mul(1u32 << exponent)
            }
        }
    }
}
