//! Continuation policy: what a page response means for the pagination chain
//!
//! [`classify`] maps an HTTP response onto the four outcomes the worker acts
//! on. For a successful page, [`ContinuationPolicy::next_step`] decides whether
//! another page of the same identifier should be fetched. Two independent
//! loop guards stop a chain that would otherwise page forever:
//!
//! - a cursor whose `start-date` and `end-date` denote the same instant
//! - a cursor that templatizes back to the URL that was just fetched

use crate::client::{ApiResponse, resolve_cursor};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::template::UrlTemplate;
use crate::types::{ApiPage, JobDescriptor};
use chrono::DateTime;
use std::time::Duration;
use url::Url;

/// Outcome of classifying one HTTP response
#[derive(Debug)]
pub enum Classified {
    /// 200 with a `messages` field
    Page(ApiPage),
    /// 404: no data for this identifier
    NotFound,
    /// 400: retry the same job after a delay
    Transient,
    /// Anything else the worker cannot recover from
    Fatal(Error),
}

/// Whether the current identifier has more pages
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Continuation {
    /// Fetch the page at this template URL next
    Continue(String),
    /// Pagination for the current identifier is over
    ExhaustedIdentifier,
}

/// Full decision for one response
///
/// Successful pages travel with the decision so the caller can persist them
/// before acting on it.
#[derive(Debug)]
pub enum Decision {
    /// Persist `page`, then fetch the page at `next_url`
    Continue {
        /// Page returned by this response
        page: ApiPage,
        /// Template URL of the next page
        next_url: String,
    },
    /// Persist `page` if any, then move past the current identifier
    ExhaustedIdentifier {
        /// Page returned by this response; `None` for a 404
        page: Option<ApiPage>,
    },
    /// Report failure without a successor
    Fatal(Error),
    /// Wait this long, then report failure so the queue re-runs the job
    TransientRetry(Duration),
}

/// Map an HTTP response onto a [`Classified`] outcome
pub fn classify(response: &ApiResponse, url: &str) -> Classified {
    match response.status {
        200 => {}
        404 => return Classified::NotFound,
        400 => return Classified::Transient,
        status => return Classified::Fatal(Error::upstream_status(status, url, &response.body)),
    }

    let page: ApiPage = match serde_json::from_str(&response.body) {
        Ok(page) => page,
        Err(e) => {
            return Classified::Fatal(Error::MalformedResponse {
                url: url.to_string(),
                reason: format!("body is not valid JSON: {e}"),
            });
        }
    };

    match &page.messages {
        None => Classified::Fatal(Error::MalformedResponse {
            url: url.to_string(),
            reason: "body has no messages".to_string(),
        }),
        Some(messages) => {
            if messages.is_empty() {
                tracing::warn!(url = %url, "page contains no messages");
            }
            Classified::Page(page)
        }
    }
}

/// Pagination decisions for one worker
#[derive(Clone, Debug)]
pub struct ContinuationPolicy {
    base_url: Url,
    template: UrlTemplate,
    transient_delay: Duration,
}

impl ContinuationPolicy {
    /// Create a policy resolving cursors against `base_url`
    pub fn new(base_url: Url, template: UrlTemplate, transient_delay: Duration) -> Self {
        Self {
            base_url,
            template,
            transient_delay,
        }
    }

    /// Build a policy from the worker configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            Url::parse(&config.api.base_url)?,
            UrlTemplate::new(config.api.placeholder.clone()),
            config.jobs.transient_delay,
        ))
    }

    /// Delay applied before a transient failure is reported
    pub fn transient_delay(&self) -> Duration {
        self.transient_delay
    }

    /// Concrete URL to fetch for a job
    pub fn request_url(&self, job: &JobDescriptor) -> Result<String> {
        let current = job.current()?;
        Ok(self.template.fill(&job.url, &current.primary))
    }

    /// Decide whether the current identifier has another page
    pub fn next_step(&self, cursor: Option<&str>, job: &JobDescriptor) -> Result<Continuation> {
        let Some(cursor) = cursor.filter(|c| !c.is_empty()) else {
            return Ok(Continuation::ExhaustedIdentifier);
        };

        let absolute = resolve_cursor(&self.base_url, cursor)?;

        if has_zero_width_window(&absolute) {
            tracing::warn!(
                next = %absolute,
                "cursor start-date equals end-date, ending pagination for identifier"
            );
            return Ok(Continuation::ExhaustedIdentifier);
        }

        let primary = job.current()?.primary;
        let next_url = self.template.templatize(&absolute, &primary);
        if next_url == job.url {
            tracing::warn!(
                url = %job.url,
                "cursor points back at the current page, ending pagination for identifier"
            );
            return Ok(Continuation::ExhaustedIdentifier);
        }

        Ok(Continuation::Continue(next_url))
    }

    /// Classify a response and decide the next step in one go
    pub fn decide_next(&self, response: &ApiResponse, job: &JobDescriptor) -> Decision {
        let url = match self.request_url(job) {
            Ok(url) => url,
            Err(e) => return Decision::Fatal(e),
        };
        match classify(response, &url) {
            Classified::NotFound => {
                tracing::info!(url = %url, "no data for identifier");
                Decision::ExhaustedIdentifier { page: None }
            }
            Classified::Transient => Decision::TransientRetry(self.transient_delay),
            Classified::Fatal(e) => Decision::Fatal(e),
            Classified::Page(page) => match self.next_step(page.next.as_deref(), job) {
                Ok(Continuation::Continue(next_url)) => Decision::Continue { page, next_url },
                Ok(Continuation::ExhaustedIdentifier) => {
                    Decision::ExhaustedIdentifier { page: Some(page) }
                }
                Err(e) => Decision::Fatal(e),
            },
        }
    }
}

/// True when the URL's `start-date` and `end-date` denote the same instant
fn has_zero_width_window(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    match (
        query_param(&parsed, "start-date"),
        query_param(&parsed, "end-date"),
    ) {
        (Some(start), Some(end)) => same_instant(&start, &end),
        _ => false,
    }
}

/// Percent-decoded query parameter
///
/// `+` is kept literally: cursors carry timestamps such as
/// `2017-01-02T01:00:00+01:00` without escaping the offset sign.
fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query()?.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        (percent_decode(key) == name).then(|| percent_decode(value))
    })
}

fn percent_decode(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

fn same_instant(a: &str, b: &str) -> bool {
    match (DateTime::parse_from_rfc3339(a), DateTime::parse_from_rfc3339(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
