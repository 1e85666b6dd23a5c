//! Feed Error Taxonomy
//!
//! Every failure the price client can observe falls into one of four
//! buckets. None of them is fatal: each is absorbed by the client task
//! and turned into a state transition or a log line.

use thiserror::Error;

/// Failures observed while streaming or polling prices.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    /// The streaming transport could not be constructed or opened.
    #[error("transport unavailable: {0}")]
    TransportUnavailable(String),

    /// An open transport reported close or error.
    #[error("transport closed: {0}")]
    TransportClosed(String),

    /// An inbound payload could not be decoded into a price update.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// A polling fallback request failed or returned an unusable body.
    #[error("polling request failed: {0}")]
    PollingRequestFailed(String),
}

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedMessage(err.to_string())
    }
}
