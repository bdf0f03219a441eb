//! Error types for the HTTP control path.

use std::time::Duration;

/// Errors returned by [`HttpClient`](crate::HttpClient) and the dispatcher.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// Connection refused, reset, DNS failure and similar.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
