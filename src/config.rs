//! Configuration types for sensor-export

use crate::error::{Error, Result};
use crate::types::Priority;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Remote time-series API settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Origin that `next` cursors are resolved against (default: "https://api.opensensors.io")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key sent as `Authorization: api-key <key>`
    #[serde(default)]
    pub api_key: String,

    /// Per-request timeout (default: 120 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub timeout: Duration,

    /// Token in job URLs that stands for the current identifier (default: "${serial-number}")
    #[serde(default = "default_placeholder")]
    pub placeholder: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            timeout: default_request_timeout(),
            placeholder: default_placeholder(),
        }
    }
}

/// Scheduling policy for the jobs the worker submits
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobPolicyConfig {
    /// Attempts granted to continuation and next-identifier jobs (default: 10)
    #[serde(default = "default_download_attempts")]
    pub download_attempts: u32,

    /// Base delay of the exponential backoff for download jobs (default: 60 seconds)
    #[serde(default = "default_backoff_delay", with = "duration_serde")]
    pub download_backoff: Duration,

    /// Wait applied before reporting a transient (HTTP 400) failure (default: 60 seconds)
    #[serde(default = "default_transient_delay", with = "duration_serde")]
    pub transient_delay: Duration,

    /// Attempts granted to the stitch handoff (default: 1)
    #[serde(default = "default_stitch_attempts")]
    pub stitch_attempts: u32,

    /// Priority of every submitted job (default: high)
    #[serde(default = "default_priority")]
    pub priority: Priority,
}

impl Default for JobPolicyConfig {
    fn default() -> Self {
        Self {
            download_attempts: default_download_attempts(),
            download_backoff: default_backoff_delay(),
            transient_delay: default_transient_delay(),
            stitch_attempts: default_stitch_attempts(),
            priority: default_priority(),
        }
    }
}

/// Top-level worker configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Successor job policy
    #[serde(default)]
    pub jobs: JobPolicyConfig,
}

impl Config {
    /// Parse a configuration from JSON, filling in defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values the worker cannot run with
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.api.base_url)
            .map_err(|e| Error::config("api.base_url", format!("invalid base URL: {e}")))?;
        if self.api.api_key.trim().is_empty() {
            return Err(Error::config("api.api_key", "API key must not be empty"));
        }
        if self.api.placeholder.is_empty() {
            return Err(Error::config("api.placeholder", "placeholder must not be empty"));
        }
        if self.jobs.download_attempts == 0 {
            return Err(Error::config(
                "jobs.download_attempts",
                "download jobs need at least one attempt",
            ));
        }
        if self.jobs.stitch_attempts == 0 {
            return Err(Error::config(
                "jobs.stitch_attempts",
                "stitch jobs need at least one attempt",
            ));
        }
        Ok(())
    }
}

fn default_base_url() -> String {
    "https://api.opensensors.io".to_string()
}

fn default_placeholder() -> String {
    "${serial-number}".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_download_attempts() -> u32 {
    10
}

fn default_backoff_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_transient_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_stitch_attempts() -> u32 {
    1
}

fn default_priority() -> Priority {
    Priority::High
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Queue backoff options are expressed in milliseconds
pub(crate) mod duration_millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
