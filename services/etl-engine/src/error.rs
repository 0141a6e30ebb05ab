//! Error taxonomy for the engine
//!
//! - Configuration errors are fatal to the triggering call and never retried.
//! - Fetch errors are terminal: retries already happened inside the client.
//! - Payload errors mean a whole upstream document could not be read.
//! - Export errors abort the remaining deliveries of a run.
//!
//! Per-record data problems (a malformed date) are not errors; the transform
//! step skips and reports them.

use thiserror::Error;
use types::errors::PayloadError;

/// Top-level engine error
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Payload error: {0}")]
    Payload(#[from] PayloadError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),
}

/// Missing or unusable configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} is not configured")]
    Missing { name: &'static str },

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Terminal outcome of a fetch after the retry loop gave up
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP client setup failed: {0}")]
    Setup(#[source] reqwest::Error),

    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("{method} {url} rejected with HTTP {status}: {body}")]
    ClientStatus {
        method: String,
        url: String,
        status: u16,
        body: String,
    },

    #[error("{method} {url} failed after {attempts} attempts: {last_error}")]
    Exhausted {
        method: String,
        url: String,
        attempts: u32,
        last_error: String,
    },

    #[error("{method} {url} cancelled")]
    Cancelled { method: String, url: String },

    #[error("response from {url} is not valid JSON: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl FetchError {
    /// Whether the request was abandoned because the caller went away.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled { .. })
    }
}

/// Failure while signing or delivering consolidated records
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("signing key rejected: {0}")]
    Signing(String),

    #[error("delivery of {channel}/{campaign_id} failed after {delivered} records were sent: {source}")]
    Delivery {
        channel: String,
        campaign_id: String,
        delivered: usize,
        #[source]
        source: FetchError,
    },
}
