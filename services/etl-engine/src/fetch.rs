//! Retrying HTTP client for the upstream sources and the export sink
//!
//! One request walks a small state machine:
//!
//! ```text
//!   Attempting(n) ──ok──────────────────────────▶ Succeeded(n)
//!        │
//!        ├──4xx───────────────────────────────▶ FailedTerminal(n)
//!        │
//!        └──other failure ─┬─ n ≤ max_retries ─▶ BackingOff(n+1, delay·n) ─▶ Attempting(n+1)
//!                          └─ otherwise ───────▶ FailedTerminal(n)
//! ```
//!
//! Transitions live in [`RetryPolicy::after_attempt`], which is pure; the
//! async driver in [`FetchClient`] only performs the I/O and the sleeps.
//! Every await point races the caller's [`CancellationToken`].

use std::time::Duration;

use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::FetchConfig;
use crate::error::FetchError;

// ---------------------------------------------------------------------------
// Retry state machine
// ---------------------------------------------------------------------------

/// How a single attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    /// Transport error, timeout or a non-4xx error status.
    Retryable,
    /// 4xx: the request itself is wrong, repeating it cannot help.
    NonRetryable,
}

impl AttemptOutcome {
    pub fn from_status(status: StatusCode) -> Self {
        if status.is_client_error() {
            AttemptOutcome::NonRetryable
        } else if status.is_success() {
            AttemptOutcome::Success
        } else {
            AttemptOutcome::Retryable
        }
    }
}

/// Where a request stands. Attempts are numbered from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    Attempting { attempt: u32 },
    BackingOff { next_attempt: u32, delay: Duration },
    Succeeded { attempts: u32 },
    FailedTerminal { attempts: u32 },
}

impl RetryState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RetryState::Succeeded { .. } | RetryState::FailedTerminal { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            max_retries,
            retry_delay,
        }
    }

    /// Total attempts allowed: the first one plus `max_retries`.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Wait before the attempt following failed attempt `attempt`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.retry_delay.saturating_mul(attempt)
    }

    /// Next state after attempt number `attempt` ended with `outcome`.
    pub fn after_attempt(&self, attempt: u32, outcome: AttemptOutcome) -> RetryState {
        match outcome {
            AttemptOutcome::Success => RetryState::Succeeded { attempts: attempt },
            AttemptOutcome::NonRetryable => RetryState::FailedTerminal { attempts: attempt },
            AttemptOutcome::Retryable if attempt < self.max_attempts() => RetryState::BackingOff {
                next_attempt: attempt + 1,
                delay: self.backoff(attempt),
            },
            AttemptOutcome::Retryable => RetryState::FailedTerminal { attempts: attempt },
        }
    }
}

impl From<&FetchConfig> for RetryPolicy {
    fn from(config: &FetchConfig) -> Self {
        Self::new(config.max_retries, config.retry_delay)
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Outcome of one attempt, with whatever the next state needs.
enum Attempt {
    Ok(Vec<u8>),
    Failed {
        outcome: AttemptOutcome,
        status: Option<u16>,
        error: String,
    },
}

/// Cloneable HTTP client with per-attempt timeout and retry/backoff.
#[derive(Debug, Clone)]
pub struct FetchClient {
    http: Client,
    policy: RetryPolicy,
}

impl FetchClient {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(FetchError::Setup)?;
        Ok(Self {
            http,
            policy: RetryPolicy::from(config),
        })
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// GET `url` and return the raw response body.
    pub async fn get(&self, url: &str, cancel: &CancellationToken) -> Result<Vec<u8>, FetchError> {
        self.execute(Method::GET, url, None, &[], cancel).await
    }

    /// GET `url` and decode the body as JSON.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<T, FetchError> {
        let body = self.get(url, cancel).await?;
        serde_json::from_slice(&body).map_err(|source| FetchError::Decode {
            url: url.to_string(),
            source,
        })
    }

    /// POST `body` as JSON with extra headers; the response body is discarded.
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        headers: &[(&str, &str)],
        cancel: &CancellationToken,
    ) -> Result<(), FetchError> {
        let payload = serde_json::to_vec(body).map_err(FetchError::Encode)?;
        self.execute(Method::POST, url, Some(payload), headers, cancel)
            .await
            .map(|_| ())
    }

    async fn execute(
        &self,
        method: Method,
        url: &str,
        body: Option<Vec<u8>>,
        headers: &[(&str, &str)],
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, FetchError> {
        let cancelled = || FetchError::Cancelled {
            method: method.to_string(),
            url: url.to_string(),
        };

        let mut state = RetryState::Attempting { attempt: 1 };
        let mut last_error = String::new();

        loop {
            match state {
                RetryState::Attempting { attempt } => {
                    let result = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(cancelled()),
                        result = self.attempt(&method, url, body.as_deref(), headers) => result,
                    };

                    match result {
                        Attempt::Ok(bytes) => {
                            debug!(%method, url, attempts = attempt, "Request succeeded");
                            return Ok(bytes);
                        }
                        Attempt::Failed {
                            outcome,
                            status,
                            error,
                        } => {
                            warn!(
                                %method,
                                url,
                                attempt,
                                status,
                                error = %error,
                                "Request failed"
                            );
                            state = self.policy.after_attempt(attempt, outcome);
                            if outcome == AttemptOutcome::NonRetryable {
                                return Err(FetchError::ClientStatus {
                                    method: method.to_string(),
                                    url: url.to_string(),
                                    status: status.unwrap_or_default(),
                                    body: error,
                                });
                            }
                            last_error = error;
                        }
                    }
                }
                RetryState::BackingOff {
                    next_attempt,
                    delay,
                } => {
                    debug!(%method, url, next_attempt, ?delay, "Backing off");
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(cancelled()),
                        _ = tokio::time::sleep(delay) => {}
                    }
                    state = RetryState::Attempting {
                        attempt: next_attempt,
                    };
                }
                // Success returns straight from the attempt arm.
                RetryState::Succeeded { attempts } | RetryState::FailedTerminal { attempts } => {
                    return Err(FetchError::Exhausted {
                        method: method.to_string(),
                        url: url.to_string(),
                        attempts,
                        last_error,
                    });
                }
            }
        }
    }

    async fn attempt(
        &self,
        method: &Method,
        url: &str,
        body: Option<&[u8]>,
        headers: &[(&str, &str)],
    ) -> Attempt {
        let mut request = self.http.request(method.clone(), url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        if let Some(body) = body {
            request = request
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body.to_vec());
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                return Attempt::Failed {
                    outcome: AttemptOutcome::Retryable,
                    status: None,
                    error: err.to_string(),
                }
            }
        };

        let status = response.status();
        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(err) => {
                return Attempt::Failed {
                    outcome: AttemptOutcome::Retryable,
                    status: Some(status.as_u16()),
                    error: format!("failed to read response body: {err}"),
                }
            }
        };

        match AttemptOutcome::from_status(status) {
            AttemptOutcome::Success => Attempt::Ok(bytes.to_vec()),
            outcome => Attempt::Failed {
                outcome,
                status: Some(status.as_u16()),
                error: format!("HTTP {}: {}", status.as_u16(), String::from_utf8_lossy(&bytes)),
            },
        }
    }
}
