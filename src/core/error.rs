//! Error types shared by the fetch layer, the rate normalizer and the sheet store.

use std::time::Duration;
use thiserror::Error;

/// Failure of a single outbound request after timeout and retry handling.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Request timed out after {}ms: {url}", .after.as_millis())]
    Timeout { url: String, after: Duration },

    #[error("Transport error for {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP error: {status} for {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("Failed to parse JSON response for {url}: {message}")]
    Decode { url: String, message: String },
}

impl FetchError {
    /// Transport-level failures are retried; logical failures are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Transport { .. } => true,
            Self::Status { status, .. } => {
                status.is_server_error() || *status == reqwest::StatusCode::TOO_MANY_REQUESTS
            }
            Self::Decode { .. } => false,
        }
    }
}

/// A currency pair that could not be turned into a multiplier.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedPair {
    pub pair: String,
    pub reason: String,
}

/// Raised when any required exchange rate is missing. No partial table exists.
#[derive(Error, Debug)]
#[error("Failed to resolve exchange rates for: {}", format_failed(.failed))]
pub struct NormalizationError {
    pub failed: Vec<FailedPair>,
}

fn format_failed(failed: &[FailedPair]) -> String {
    failed
        .iter()
        .map(|f| format!("{} ({})", f.pair, f.reason))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Sheet store request failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Sheet store rejected the request: {code} {message}")]
    Rejected { code: i64, message: String },

    #[error("Invalid URL for datasheet {datasheet}: {message}")]
    InvalidUrl { datasheet: String, message: String },
}
