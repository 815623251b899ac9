//! Retrying HTTP request dispatch.
//!
//! A single reusable primitive that performs one HTTP request with bounded
//! exponential-backoff retry and records a per-attempt outcome counter. It
//! knows nothing about alert semantics; the HTTP delivery handler composes
//! it with template rendering.

use reqwest::header::HeaderMap;
use reqwest::{Client, Method, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

/// Retry and backoff settings for a delivery target.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first. Values below 1 are
    /// treated as 1.
    pub max_attempts: u32,
    /// Base for the exponential backoff, in seconds. The delay after failed
    /// attempt `n` is `wait_multiplier * 2^(n-1)`; a multiplier of 0 disables
    /// the delay entirely.
    pub wait_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            wait_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Backoff delay to sleep after failed attempt `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let secs = self.wait_multiplier * 2f64.powi(attempt as i32 - 1);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    /// The request could not be constructed. Not transient, never retried.
    #[error("failed to construct request: {0}")]
    Request(#[source] reqwest::Error),

    /// The destination answered with a non-success status.
    #[error("destination returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// The attempt produced no HTTP response at all.
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// Every attempt failed; wraps the failure of the final attempt.
    #[error("request to {url} failed after {attempts} attempts: {source}")]
    Exhausted {
        url: Url,
        attempts: u32,
        #[source]
        source: Box<DispatchError>,
    },
}

impl DispatchError {
    /// The HTTP status of the final attempt, if one was received.
    pub fn final_status(&self) -> Option<StatusCode> {
        match self {
            DispatchError::Status { status, .. } => Some(*status),
            DispatchError::Exhausted { source, .. } => source.final_status(),
            _ => None,
        }
    }
}

/// Performs one HTTP request with bounded exponential-backoff retry.
///
/// Retries on transport errors and on non-2xx/3xx responses. Each attempt
/// that produced a response increments `http_requests_total` labeled by
/// method, destination host and status code; attempts that never reached the
/// destination do not. The timeout applies per attempt, not to the delivery
/// as a whole.
#[instrument(skip_all, fields(method = %method, url = %url))]
pub async fn dispatch(
    client: &Client,
    method: Method,
    url: &Url,
    headers: &HeaderMap,
    body: Option<String>,
    timeout: Duration,
    retry: &RetryConfig,
) -> Result<Response, DispatchError> {
    let max_attempts = retry.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let mut request = client
            .request(method.clone(), url.clone())
            .headers(headers.clone())
            .timeout(timeout);
        if let Some(body) = &body {
            request = request.body(body.clone());
        }

        let outcome = match request.send().await {
            Ok(response) => {
                let status = response.status();
                record_attempt(&method, url, status);
                if status.is_client_error() || status.is_server_error() {
                    let body = response.text().await.unwrap_or_default();
                    Err(DispatchError::Status { status, body })
                } else {
                    Ok(response)
                }
            }
            Err(err) if err.is_builder() => return Err(DispatchError::Request(err)),
            Err(err) => Err(DispatchError::Transport(err)),
        };

        match outcome {
            Ok(response) => return Ok(response),
            Err(failure) => {
                warn!(attempt, max_attempts, error = %failure, "request attempt failed");
                if attempt >= max_attempts {
                    return Err(DispatchError::Exhausted {
                        url: url.clone(),
                        attempts: max_attempts,
                        source: Box::new(failure),
                    });
                }
                let delay = retry.delay_after(attempt);
                if !delay.is_zero() {
                    debug!(delay_ms = delay.as_millis() as u64, "retrying after backoff");
                }
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Records one completed attempt on the request-outcome counter.
fn record_attempt(method: &Method, url: &Url, status: StatusCode) {
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "host" => url.host_str().unwrap_or_default().to_string(),
        "status_code" => status.as_u16().to_string(),
    )
    .increment(1);
}
