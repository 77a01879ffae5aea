//! Ticket backend error types.

use thiserror::Error;

/// Result type alias for tracker operations
pub type TrackerResult<T> = Result<T, TrackerError>;

/// Errors from the Linear GraphQL backend.
///
/// Every variant is a "backend request failed" outcome from the caller's
/// point of view; the split exists so logs say *why*.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Transport-level failure (connect, timeout, TLS).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-200 status.
    #[error("{operation} returned HTTP {status}: {body}")]
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },

    /// HTTP 200 with a top-level `errors` array.
    #[error("{operation} returned GraphQL errors: {}", messages.join("; "))]
    GraphQl {
        operation: &'static str,
        messages: Vec<String>,
    },

    /// Response body did not match the expected envelope.
    #[error("{operation} response could not be decoded: {message}")]
    Decode {
        operation: &'static str,
        message: String,
    },

    /// Query succeeded but returned no matching node.
    #[error("{0} not found")]
    NotFound(String),

    /// Mutation payload reported `success: false`.
    #[error("{0} was rejected by the backend")]
    Rejected(&'static str),
}

impl TrackerError {
    /// HTTP status code, when the backend returned one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
