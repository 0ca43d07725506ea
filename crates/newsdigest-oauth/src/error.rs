//! Error types for credential operations.

/// Result type alias for credential operations.
pub type Result<T> = std::result::Result<T, CredentialError>;

/// Errors raised while validating or refreshing a credential.
///
/// Callers treat these as a per-user skip, never as pipeline-fatal. Only
/// transport errors are worth retrying; a rejected refresh means the grant
/// is gone until the user re-authorizes.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// The access token is expired and no refresh token is stored.
    #[error("credential expired and no refresh token is available")]
    ExpiredNoRefreshToken,

    /// The provider rejected the refresh request (e.g. `invalid_grant`).
    #[error("refresh rejected by provider: {error} - {description}")]
    RefreshRejected {
        /// Provider error code.
        error: String,
        /// Human-readable description, may be empty.
        description: String,
    },

    /// Network-level failure reaching the token endpoint.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The token endpoint returned something we could not interpret.
    #[error("invalid token response: {0}")]
    InvalidResponse(String),

    /// JSON decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Token endpoint URL is malformed.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

impl CredentialError {
    /// True for transient failures that a caller may retry with backoff.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn rejected_refresh_is_not_retryable() {
        let err = CredentialError::RefreshRejected {
            error: "invalid_grant".to_string(),
            description: "Token has been revoked".to_string(),
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn missing_refresh_token_is_not_retryable() {
        assert!(!CredentialError::ExpiredNoRefreshToken.is_retryable());
    }
}
