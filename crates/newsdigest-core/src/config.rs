//! Pipeline configuration from the environment.

use chrono::Duration;
use newsdigest_oauth::TokenClient;

use crate::error::{Error, Result};

/// Default database file when none is configured.
const DEFAULT_DATABASE: &str = "newsdigest.db";

/// Default look-ahead for the credential refresh sweep, in hours.
const DEFAULT_REFRESH_HOURS: i64 = 6;

/// Everything the pipeline needs from the environment.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Google OAuth client id.
    pub google_client_id: String,
    /// Google OAuth client secret.
    pub google_client_secret: String,
    /// Path to the SQLite database file.
    pub database_path: String,
    /// Refresh sweep look-ahead in hours.
    pub refresh_look_ahead_hours: i64,
}

impl PipelineConfig {
    /// Reads configuration from process environment variables.
    ///
    /// `GOOGLE_CLIENT_ID` and `GOOGLE_CLIENT_SECRET` are required.
    /// `NEWSDIGEST_DB` and `NEWSDIGEST_REFRESH_HOURS` have defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when a required variable is missing or a
    /// numeric variable does not parse.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let google_client_id = lookup("GOOGLE_CLIENT_ID")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| Error::Config("GOOGLE_CLIENT_ID is not set".to_string()))?;
        let google_client_secret = lookup("GOOGLE_CLIENT_SECRET")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| Error::Config("GOOGLE_CLIENT_SECRET is not set".to_string()))?;

        let database_path = lookup("NEWSDIGEST_DB").unwrap_or_else(|| DEFAULT_DATABASE.to_string());

        let refresh_look_ahead_hours = match lookup("NEWSDIGEST_REFRESH_HOURS") {
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|h| *h > 0)
                .ok_or_else(|| {
                    Error::Config(format!("NEWSDIGEST_REFRESH_HOURS is not a positive integer: {raw}"))
                })?,
            None => DEFAULT_REFRESH_HOURS,
        };

        Ok(Self {
            google_client_id,
            google_client_secret,
            database_path,
            refresh_look_ahead_hours,
        })
    }

    /// Builds the token client for the configured Google OAuth app.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn token_client(&self) -> Result<TokenClient> {
        Ok(TokenClient::google(
            &self.google_client_id,
            &self.google_client_secret,
        )?)
    }

    /// The refresh sweep look-ahead as a duration.
    #[must_use]
    pub fn refresh_look_ahead(&self) -> Duration {
        Duration::hours(self.refresh_look_ahead_hours)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        let map: HashMap<&str, &str> = vars.iter().copied().collect();
        move |key| map.get(key).map(ToString::to_string)
    }

    #[test]
    fn full_config_parses() {
        let config = PipelineConfig::from_lookup(lookup(&[
            ("GOOGLE_CLIENT_ID", "id"),
            ("GOOGLE_CLIENT_SECRET", "secret"),
            ("NEWSDIGEST_DB", "/tmp/test.db"),
            ("NEWSDIGEST_REFRESH_HOURS", "12"),
        ]))
        .unwrap();

        assert_eq!(config.database_path, "/tmp/test.db");
        assert_eq!(config.refresh_look_ahead(), Duration::hours(12));
    }

    #[test]
    fn defaults_apply() {
        let config = PipelineConfig::from_lookup(lookup(&[
            ("GOOGLE_CLIENT_ID", "id"),
            ("GOOGLE_CLIENT_SECRET", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.database_path, DEFAULT_DATABASE);
        assert_eq!(config.refresh_look_ahead_hours, 6);
    }

    #[test]
    fn missing_client_id_is_rejected() {
        let err =
            PipelineConfig::from_lookup(lookup(&[("GOOGLE_CLIENT_SECRET", "secret")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn bad_refresh_hours_is_rejected() {
        let err = PipelineConfig::from_lookup(lookup(&[
            ("GOOGLE_CLIENT_ID", "id"),
            ("GOOGLE_CLIENT_SECRET", "secret"),
            ("NEWSDIGEST_REFRESH_HOURS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
