//! Seams between the pipeline and its collaborators.
//!
//! The assembler is generic over these traits so tests can swap in fixed
//! implementations, and so the summarizer and synthesizer backends can be
//! replaced without touching the pipeline. Every port has a deterministic
//! fallback: a backend failure degrades one email or one section, never a
//! whole run.

use chrono::{DateTime, Utc};
use newsdigest_gmail::RawMessage;
use newsdigest_oauth::Credential;
use thiserror::Error;

use crate::Result;
use crate::digest::CleanedEmail;

/// Persistent storage for per-owner OAuth credentials.
#[allow(async_fn_in_trait)]
pub trait CredentialStore {
    /// Load the credential for an owner, if one is stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage fails.
    async fn get(&self, owner: &str) -> Result<Option<Credential>>;

    /// Store or replace an owner's credential.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage fails.
    async fn put(&self, credential: &Credential) -> Result<()>;

    /// Credentials expiring at or before `before`, including those with no
    /// recorded expiry.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage fails.
    async fn list_expiring(&self, before: DateTime<Utc>) -> Result<Vec<Credential>>;
}

/// A mail provider the pipeline can pull newsletters from.
#[allow(async_fn_in_trait)]
pub trait MailSource {
    /// Fetch all messages from `senders` received in `[since, until)`.
    ///
    /// # Errors
    ///
    /// Returns an error when the provider rejects the request or the token.
    async fn fetch(
        &self,
        senders: &[String],
        since: DateTime<Utc>,
        until: DateTime<Utc>,
        access_token: &str,
    ) -> newsdigest_gmail::Result<Vec<RawMessage>>;
}

impl MailSource for newsdigest_gmail::GmailClient {
    async fn fetch(
        &self,
        senders: &[String],
        since: DateTime<Utc>,
        until: DateTime<Utc>,
        access_token: &str,
    ) -> newsdigest_gmail::Result<Vec<RawMessage>> {
        Self::fetch(self, senders, since, until, access_token).await
    }
}

/// A summarizer or synthesizer backend failure.
///
/// Deliberately opaque: the pipeline only logs it and falls back.
#[derive(Debug, Error)]
#[error("backend unavailable: {0}")]
pub struct SummaryError(pub String);

/// What the summarizer produces for one email.
#[derive(Debug, Clone)]
pub struct EmailSummary {
    /// Short prose summary of the content.
    pub summary: String,
    /// Assigned topics.
    pub topics: Vec<String>,
    /// Extracted keywords.
    pub keywords: Vec<String>,
}

/// Produces a summary, topics, and keywords for one email.
#[allow(async_fn_in_trait)]
pub trait Summarizer {
    /// Summarize one email's cleaned content.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend is unavailable; the caller applies
    /// [`fallback_summary`].
    async fn summarize(
        &self,
        subject: &str,
        content: &str,
    ) -> std::result::Result<EmailSummary, SummaryError>;
}

/// Produces a narrative paragraph for one theme cluster.
#[allow(async_fn_in_trait)]
pub trait Synthesizer {
    /// Write a narrative covering the cluster's member emails.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend is unavailable; the caller applies
    /// [`fallback_narrative`].
    async fn synthesize(
        &self,
        theme: &str,
        members: &[CleanedEmail],
    ) -> std::result::Result<String, SummaryError>;
}

/// The placeholder summary used when the summarizer fails.
///
/// The sentinel keyword keeps the email classifiable (it lands in the
/// catch-all cluster) and makes the failure visible in stored data.
#[must_use]
pub fn fallback_summary() -> EmailSummary {
    EmailSummary {
        summary: "Summary unavailable for this email.".to_string(),
        topics: vec!["Miscellaneous".to_string()],
        keywords: vec!["error".to_string()],
    }
}

/// Templated narrative used when the synthesizer fails.
#[must_use]
pub fn fallback_narrative(theme: &str, members: &[CleanedEmail], keywords: &[String]) -> String {
    let stories = if members.len() == 1 {
        "1 newsletter".to_string()
    } else {
        format!("{} newsletters", members.len())
    };

    if keywords.is_empty() {
        format!("{stories} covered {theme} today.")
    } else {
        let highlights = keywords
            .iter()
            .take(3)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        format!("{stories} covered {theme} today. Recurring topics: {highlights}.")
    }
}
