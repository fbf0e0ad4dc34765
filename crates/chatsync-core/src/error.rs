use std::time::Duration;
use thiserror::Error;

/// Failure of a message fetch, as seen by the retry loop and its callers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),
    #[error("server error (HTTP {status})")]
    Server5xx { status: u16 },
    #[error("API error (HTTP {status}, {code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },
    #[error("malformed server response: {0}")]
    MalformedResponse(String),
    #[error("server version {version} is not supported")]
    ServerTooOld { version: String },
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("request cancelled")]
    Cancelled,
}

impl FetchError {
    /// Transient failures worth another attempt: connectivity trouble and
    /// server-side 5xx. Everything else fails fast.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Network(_) | FetchError::Server5xx { .. })
    }

    /// Classify an HTTP status from the transport into the matching error.
    pub fn from_status(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        if (500..600).contains(&status) {
            FetchError::Server5xx { status }
        } else {
            FetchError::Api {
                status,
                code: code.into(),
                message: message.into(),
            }
        }
    }
}

/// Report a broken internal invariant. Panics in debug builds so tests
/// catch it; logs and carries on in release builds.
#[track_caller]
pub fn report_invariant_violation(message: &str) {
    if cfg!(debug_assertions) {
        panic!("invariant violation: {}", message);
    }
    tracing::error!(target: "chatsync::invariant", "invariant violation: {}", message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(FetchError::Network("reset".into()).is_retryable());
        assert!(FetchError::from_status(503, "", "").is_retryable());
        assert!(!FetchError::from_status(400, "BAD_REQUEST", "nope").is_retryable());
        assert!(!FetchError::MalformedResponse("x".into()).is_retryable());
        assert!(!FetchError::ServerTooOld { version: "1.0".into() }.is_retryable());
        assert!(!FetchError::Timeout(Duration::from_secs(60)).is_retryable());
        assert!(!FetchError::Cancelled.is_retryable());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "invariant violation")]
    fn test_invariant_violation_panics_in_debug() {
        report_invariant_violation("narrow index references missing message");
    }
}
