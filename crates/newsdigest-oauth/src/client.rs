//! Token endpoint client and the `ensure_valid` contract.

use std::collections::HashMap;
use std::time::Duration as StdDuration;

use chrono::Duration;
use reqwest::Client;
use tracing::{debug, info};
use url::Url;

use crate::credential::{Credential, TokenErrorResponse, TokenResponse};
use crate::error::{CredentialError, Result};

/// Google's `OAuth2` token endpoint.
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Timeout for token endpoint requests.
const TOKEN_REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(10);

/// Outcome of [`TokenClient::ensure_valid`].
///
/// `Refreshed` is the "persist me" signal: the caller must write the new
/// credential back through its token store. The client itself never writes
/// to storage.
#[derive(Debug, Clone)]
pub enum EnsureOutcome {
    /// The credential was still valid; returned untouched, no network call.
    Unchanged(Credential),
    /// The credential was refreshed and should be persisted.
    Refreshed(Credential),
}

impl EnsureOutcome {
    /// The usable credential, whichever variant.
    #[must_use]
    pub fn credential(&self) -> &Credential {
        match self {
            Self::Unchanged(cred) | Self::Refreshed(cred) => cred,
        }
    }

    /// Consumes the outcome, returning the credential.
    #[must_use]
    pub fn into_credential(self) -> Credential {
        match self {
            Self::Unchanged(cred) | Self::Refreshed(cred) => cred,
        }
    }

    /// True if the caller should persist the credential.
    #[must_use]
    pub const fn needs_persist(&self) -> bool {
        matches!(self, Self::Refreshed(_))
    }
}

/// Client for the provider's token endpoint.
#[derive(Debug, Clone)]
pub struct TokenClient {
    client_id: String,
    client_secret: Option<String>,
    token_url: Url,
    http_client: Client,
}

impl TokenClient {
    /// Creates a token client for an arbitrary provider endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if `token_url` is not a valid URL or the HTTP client
    /// cannot be constructed.
    pub fn new(client_id: impl Into<String>, token_url: impl AsRef<str>) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(TOKEN_REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client_id: client_id.into(),
            client_secret: None,
            token_url: Url::parse(token_url.as_ref())?,
            http_client,
        })
    }

    /// Creates a token client for Google's token endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn google(client_id: impl Into<String>, client_secret: impl Into<String>) -> Result<Self> {
        Ok(Self::new(client_id, GOOGLE_TOKEN_URL)?.with_client_secret(client_secret))
    }

    /// Sets the client secret (required for confidential clients).
    #[must_use]
    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    /// Returns a credential guaranteed valid for at least `look_ahead`.
    ///
    /// If the access token's expiry is beyond the look-ahead window, the
    /// input is returned unchanged without any network call. Otherwise the
    /// stored refresh token is exchanged at the token endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::ExpiredNoRefreshToken`] when a refresh is
    /// needed but no refresh token is stored, [`CredentialError::RefreshRejected`]
    /// when the provider declines the grant, or a transport error.
    pub async fn ensure_valid(
        &self,
        credential: Credential,
        look_ahead: Duration,
    ) -> Result<EnsureOutcome> {
        if !credential.is_expired(look_ahead) {
            debug!(owner = %credential.owner, "access token still valid");
            return Ok(EnsureOutcome::Unchanged(credential));
        }

        info!(owner = %credential.owner, "refreshing access token");
        let refreshed = self.refresh(&credential).await?;
        Ok(EnsureOutcome::Refreshed(refreshed))
    }

    /// Refreshes `credential` unconditionally.
    ///
    /// A refresh token omitted from the provider response is carried over
    /// from the input credential.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Self::ensure_valid`].
    pub async fn refresh(&self, credential: &Credential) -> Result<Credential> {
        let refresh_token = credential.refresh_token()?;

        let mut params = HashMap::new();
        params.insert("grant_type", "refresh_token");
        params.insert("refresh_token", refresh_token);
        params.insert("client_id", &self.client_id);
        if let Some(secret) = &self.client_secret {
            params.insert("client_secret", secret);
        }

        let response = self
            .http_client
            .post(self.token_url.clone())
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error: TokenErrorResponse = response.json().await.map_err(|_| {
                CredentialError::InvalidResponse(format!(
                    "token endpoint returned {status} with undecodable body"
                ))
            })?;
            return Err(error.into_error());
        }

        let token_response: TokenResponse = response.json().await?;
        Ok(credential.updated_from(token_response))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn client_construction() {
        let client = TokenClient::google("id", "secret").unwrap();
        assert_eq!(client.client_id, "id");
        assert_eq!(client.client_secret.as_deref(), Some("secret"));
        assert_eq!(client.token_url.as_str(), GOOGLE_TOKEN_URL);
    }

    #[test]
    fn invalid_token_url_rejected() {
        assert!(TokenClient::new("id", "not a url").is_err());
    }

    #[tokio::test]
    async fn valid_credential_is_unchanged_without_network() {
        // No server behind this client; a network call would fail the test.
        let client = TokenClient::google("id", "secret").unwrap();
        let cred = Credential::new("user@example.com", "access")
            .with_expires_at(Utc::now() + Duration::hours(1));

        let outcome = client.ensure_valid(cred, Duration::zero()).await.unwrap();
        assert!(!outcome.needs_persist());
        assert_eq!(outcome.credential().access_token, "access");
    }

    #[tokio::test]
    async fn expired_without_refresh_token_fails() {
        let client = TokenClient::google("id", "secret").unwrap();
        let cred = Credential::new("user@example.com", "access")
            .with_expires_at(Utc::now() - Duration::hours(1));

        let err = client
            .ensure_valid(cred, Duration::zero())
            .await
            .unwrap_err();
        assert!(matches!(err, CredentialError::ExpiredNoRefreshToken));
    }
}
