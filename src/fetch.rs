//! Timeout-bounded, retrying HTTP fetch.
//!
//! All upstream endpoints are flaky in their own ways, so every request goes
//! through one policy-driven wrapper: a cancellation deadline per attempt,
//! a bounded retry budget with optional delay, a configurable definition of
//! "acceptable status", and an early-out on 404 so callers can distinguish
//! "country has no data" from transient failure.

use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tracing::warn;

/// Which response statuses satisfy a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuccessPolicy {
    /// Exactly 200.
    Only200,
    /// Any 2xx status.
    Any2xx,
}

impl SuccessPolicy {
    pub fn accepts(&self, status: StatusCode) -> bool {
        match self {
            SuccessPolicy::Only200 => status == StatusCode::OK,
            SuccessPolicy::Any2xx => status.is_success(),
        }
    }
}

/// Retry/timeout policy for a single logical fetch.
#[derive(Debug, Clone)]
pub struct FetchPolicy {
    /// Deadline for each individual attempt.
    pub timeout: Duration,
    /// Additional attempts after the first.
    pub retry_limit: u32,
    /// Pause between attempts. Zero means retry immediately.
    pub retry_delay: Duration,
    pub success_policy: SuccessPolicy,
    /// Surface a 404 response immediately instead of burning retries on it.
    pub stop_on_not_found: bool,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(8),
            retry_limit: 5,
            retry_delay: Duration::ZERO,
            success_policy: SuccessPolicy::Only200,
            stop_on_not_found: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("response not OK, {0} instead")]
    BadStatus(StatusCode),
    #[error("exceeded retry limit ({attempts} attempts), last failure: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<FetchError>,
    },
}

/// GET `url` under `policy`.
///
/// Returns the first response satisfying the success policy, or the 404
/// response itself when `stop_on_not_found` is set. Once the retry budget is
/// exhausted the last-seen failure is surfaced inside
/// [`FetchError::RetriesExhausted`].
pub async fn fetch_with_policy(
    client: &Client,
    url: &str,
    policy: &FetchPolicy,
) -> Result<Response, FetchError> {
    let attempts = policy.retry_limit + 1;
    let mut last = FetchError::Timeout(policy.timeout);

    for attempt in 0..attempts {
        if attempt > 0 {
            warn!(url, attempt, "retrying request");
            if !policy.retry_delay.is_zero() {
                tokio::time::sleep(policy.retry_delay).await;
            }
        }

        last = match timeout(policy.timeout, client.get(url).send()).await {
            Err(_) => FetchError::Timeout(policy.timeout),
            Ok(Err(err)) => FetchError::Transport(err),
            Ok(Ok(response)) => {
                if policy.stop_on_not_found && response.status() == StatusCode::NOT_FOUND {
                    warn!(url, "404 encountered with retry bypass, stopping retries");
                    return Ok(response);
                }
                if policy.success_policy.accepts(response.status()) {
                    return Ok(response);
                }
                FetchError::BadStatus(response.status())
            }
        };
    }

    Err(FetchError::RetriesExhausted {
        attempts,
        last: Box::new(last),
    })
}
