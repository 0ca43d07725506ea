//! Error types for Gmail API operations.

/// Result type alias for fetch operations.
pub type Result<T> = std::result::Result<T, FetchError>;

/// Errors raised while talking to the Gmail API.
///
/// A fetch failure is a per-user skip for the day, retried with backoff for
/// transport failures only.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Network-level failure reaching the API.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The access token was rejected (401).
    #[error("access token rejected by provider")]
    AuthExpired,

    /// Non-success API response.
    #[error("Gmail API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, as returned.
        message: String,
    },
}

impl FetchError {
    /// True for transient failures worth retrying with backoff.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::AuthExpired => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_retryable() {
        let err = FetchError::Api {
            status: 503,
            message: "backend unavailable".to_string(),
        };
        assert!(err.is_retryable());
    }

    #[test]
    fn client_errors_are_not_retryable() {
        let err = FetchError::Api {
            status: 400,
            message: "bad query".to_string(),
        };
        assert!(!err.is_retryable());
        assert!(!FetchError::AuthExpired.is_retryable());
    }
}
