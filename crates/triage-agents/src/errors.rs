//! Classification exchange error taxonomy.
//!
//! Every failure of a classification exchange is an "engine produced no
//! result" outcome for the pipeline: callers convert it to `None` and apply
//! their documented fallback. The variants only exist so logs say why.
//!
//! | Variant            | Outcome class        | Raised when                              |
//! |--------------------|----------------------|------------------------------------------|
//! | `Http`             | transport            | request could not be sent / read         |
//! | `Status`           | transport            | engine API answered non-2xx              |
//! | `Decode`           | transport            | engine API body not the expected shape   |
//! | `NoStructuredCall` | no result            | run completed without a function call    |
//! | `RunFailed`        | no result            | run ended failed/cancelled/expired/...   |
//! | `Timeout`          | no result            | run still pending after the deadline     |
//! | `SchemaViolation`  | no result            | arguments broke the declared schema      |

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Coarse grouping used for log levels and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// The engine API itself misbehaved (network, status, body shape).
    Transport,
    /// The exchange ran but did not yield a usable structured result.
    NoResult,
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport => write!(f, "transport"),
            Self::NoResult => write!(f, "no_result"),
        }
    }
}

/// Error type for classification exchanges.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Engine request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Engine {operation} returned HTTP {status}: {body}")]
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("Engine {operation} response could not be decoded: {message}")]
    Decode {
        operation: &'static str,
        message: String,
    },

    /// Run reached `completed` without calling the declared function.
    #[error("Run completed without a structured call")]
    NoStructuredCall,

    /// Run reached a terminal state other than `completed`/`requires_action`.
    #[error("Run ended with status '{status}'")]
    RunFailed { status: String },

    #[error("Run did not finish within {waited:?}")]
    Timeout { waited: Duration },

    #[error("Structured result violates schema: {0}")]
    SchemaViolation(String),
}

impl EngineError {
    pub fn class(&self) -> FailureClass {
        match self {
            Self::Http(_) | Self::Status { .. } | Self::Decode { .. } => FailureClass::Transport,
            Self::NoStructuredCall
            | Self::RunFailed { .. }
            | Self::Timeout { .. }
            | Self::SchemaViolation(_) => FailureClass::NoResult,
        }
    }

    /// Convenience for schema violations.
    pub fn schema(message: impl Into<String>) -> Self {
        Self::SchemaViolation(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_variants_are_no_result() {
        assert_eq!(EngineError::NoStructuredCall.class(), FailureClass::NoResult);
        assert_eq!(
            EngineError::Timeout {
                waited: Duration::from_secs(120)
            }
            .class(),
            FailureClass::NoResult
        );
        assert_eq!(
            EngineError::schema("missing request_type").class(),
            FailureClass::NoResult
        );
    }

    #[test]
    fn status_is_transport() {
        let err = EngineError::Status {
            operation: "create_run",
            status: 429,
            body: "rate limited".into(),
        };
        assert_eq!(err.class(), FailureClass::Transport);
        assert_eq!(
            err.to_string(),
            "Engine create_run returned HTTP 429: rate limited"
        );
    }

    #[test]
    fn run_failed_display_names_status() {
        let err = EngineError::RunFailed {
            status: "expired".into(),
        };
        assert_eq!(err.to_string(), "Run ended with status 'expired'");
        assert_eq!(FailureClass::NoResult.to_string(), "no_result");
    }
}
