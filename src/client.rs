//! HTTP client for the remote time-series API

use crate::config::ApiConfig;
use crate::error::Result;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use url::Url;

/// Raw outcome of one page request
///
/// Non-2xx statuses are not errors at this level; the continuation policy
/// decides what each status means.
#[derive(Clone, Debug)]
pub struct ApiResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body as text
    pub body: String,
}

/// Authenticated client for page requests
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl ApiClient {
    /// Build a client from the API configuration
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            base_url: Url::parse(&config.base_url)?,
            api_key: config.api_key.clone(),
        })
    }

    /// Origin continuation cursors are resolved against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetch one page
    ///
    /// Only transport failures are returned as errors.
    pub async fn get(&self, url: &str) -> Result<ApiResponse> {
        tracing::debug!(url = %url, "requesting page");
        let response = self
            .http
            .get(url)
            .header(ACCEPT, "application/json")
            .header(AUTHORIZATION, format!("api-key {}", self.api_key))
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        tracing::debug!(url = %url, status, bytes = body.len(), "page response received");
        Ok(ApiResponse { status, body })
    }
}

/// Resolve a `next` cursor against the API origin
///
/// Cursors are paths such as `/api/1.0/messages/device/x?start-date=...`;
/// absolute cursors are accepted as-is.
pub fn resolve_cursor(base: &Url, cursor: &str) -> Result<String> {
    Ok(base.join(cursor)?.to_string())
}
