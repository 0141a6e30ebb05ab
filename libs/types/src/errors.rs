//! Error types shared across the ETL
//!
//! Record-level problems (a single bad date) are recoverable and are
//! reported through `DateError`; whole-document problems surface as
//! `PayloadError`.

use thiserror::Error;

/// A date literal that is not `YYYY-MM-DD`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid date {input:?}: expected YYYY-MM-DD")]
pub struct DateError {
    pub input: String,
}

/// Upstream document that cannot be processed as a batch
#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("malformed {source_name} payload: {reason}")]
    Malformed { source_name: &'static str, reason: String },

    #[error("invalid {source_name} payload JSON: {inner}")]
    Json {
        source_name: &'static str,
        #[source]
        inner: serde_json::Error,
    },
}
