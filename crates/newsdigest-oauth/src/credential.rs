//! Stored credential and token endpoint wire types.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CredentialError;

/// An `OAuth2` credential for one mailbox owner.
///
/// This is the shape persisted by the token store. During a pipeline run it
/// is owned exclusively by the credential manager; everything else reads a
/// clone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    /// Mailbox owner this credential belongs to (email address).
    pub owner: String,
    /// Access token string.
    pub access_token: String,
    /// Refresh token for obtaining new access tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Expiration time of the access token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Scope granted by the authorization server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl Credential {
    /// Creates a new credential with just an access token.
    #[must_use]
    pub fn new(owner: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
            scope: None,
        }
    }

    /// Sets the refresh token.
    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Sets the expiration time.
    #[must_use]
    pub const fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Sets the granted scope.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Checks whether the access token expires within `look_ahead`.
    ///
    /// A credential with no recorded expiry counts as expired: validity is
    /// unknown, so a refresh attempt is forced rather than risking a 401
    /// mid-fetch.
    #[must_use]
    pub fn is_expired(&self, look_ahead: Duration) -> bool {
        self.expires_at
            .is_none_or(|exp| Utc::now() + look_ahead >= exp)
    }

    /// Returns the refresh token, or the error callers skip the user on.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::ExpiredNoRefreshToken`] if absent.
    pub fn refresh_token(&self) -> Result<&str, CredentialError> {
        self.refresh_token
            .as_deref()
            .ok_or(CredentialError::ExpiredNoRefreshToken)
    }

    /// Builds the successor credential from a token endpoint response.
    ///
    /// The provider may omit the refresh token on refresh; the previously
    /// known value must be carried forward, never silently dropped.
    #[must_use]
    pub fn updated_from(&self, response: TokenResponse) -> Self {
        let expires_at = response
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds(i64::from(secs)));

        Self {
            owner: self.owner.clone(),
            access_token: response.access_token,
            refresh_token: response.refresh_token.or_else(|| self.refresh_token.clone()),
            expires_at,
            scope: response.scope.or_else(|| self.scope.clone()),
        }
    }
}

/// Success response from the `OAuth2` token endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenResponse {
    /// New access token.
    pub access_token: String,
    /// Token type (usually "Bearer").
    #[serde(default)]
    pub token_type: String,
    /// Lifetime in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u32>,
    /// Replacement refresh token, if the provider rotates them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Granted scope.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// Error response from the `OAuth2` token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenErrorResponse {
    /// Error code (e.g. `invalid_grant`).
    pub error: String,
    /// Error description.
    #[serde(default)]
    pub error_description: String,
}

impl TokenErrorResponse {
    /// Converts into the crate error type.
    #[must_use]
    pub fn into_error(self) -> CredentialError {
        CredentialError::RefreshRejected {
            error: self.error,
            description: self.error_description,
        }
    }
}
