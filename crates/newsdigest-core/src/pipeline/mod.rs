//! The daily digest pipeline.
//!
//! Orchestrates one owner's run end to end: credential check, provider
//! fetch, content extraction, summarization, thematic classification,
//! narrative synthesis, and the transactional digest swap. Single emails
//! may be skipped along the way; the run as a whole fails only when the
//! provider or the database does.

use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use newsdigest_extract::ContentExtractor;
use newsdigest_gmail::RawMessage;
use newsdigest_oauth::TokenClient;
use tracing::{debug, info, warn};

use crate::classify::{CategoryConfig, classify, relevance};
use crate::digest::{CleanedEmail, DigestRepository, NewSection, SectionMember};
use crate::error::{Error, Result};
use crate::ports::{
    CredentialStore, MailSource, Summarizer, Synthesizer, fallback_narrative, fallback_summary,
};

/// Pause before retrying a transient refresh failure during the sweep.
const SWEEP_RETRY_DELAY: std::time::Duration = std::time::Duration::from_millis(500);

/// Pipeline stages, used to tag run failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Credential validation and provider fetch.
    Fetch,
    /// Content extraction and summarization.
    Extract,
    /// Thematic classification and synthesis.
    Classify,
    /// Writing the digest to storage.
    Persist,
}

impl Stage {
    /// Stable lowercase name for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::Extract => "extract",
            Self::Classify => "classify",
            Self::Persist => "persist",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a digest run produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigestOutcome {
    /// Id of the stored digest, or `None` on an empty day.
    pub digest_id: Option<i64>,
    /// Emails that survived extraction and entered the digest.
    pub emails_processed: usize,
    /// Theme sections written.
    pub themes_created: usize,
}

impl DigestOutcome {
    /// The empty-day outcome: nothing fetched or nothing survived.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            digest_id: None,
            emails_processed: 0,
            themes_created: 0,
        }
    }
}

/// What a credential refresh sweep did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshSweep {
    /// Credentials inspected.
    pub checked: usize,
    /// Credentials refreshed and persisted.
    pub refreshed: usize,
    /// Credentials that could not be refreshed.
    pub failed: usize,
}

/// Generates daily digests for mailbox owners.
pub struct DigestAssembler<C, M, S, Y> {
    credentials: C,
    token_client: TokenClient,
    mail: M,
    extractor: ContentExtractor,
    summarizer: S,
    synthesizer: Y,
    repository: DigestRepository,
    categories: CategoryConfig,
}

impl<C, M, S, Y> DigestAssembler<C, M, S, Y>
where
    C: CredentialStore,
    M: MailSource,
    S: Summarizer,
    Y: Synthesizer,
{
    /// Wires up an assembler with the built-in category taxonomy.
    pub fn new(
        credentials: C,
        token_client: TokenClient,
        mail: M,
        extractor: ContentExtractor,
        summarizer: S,
        synthesizer: Y,
        repository: DigestRepository,
    ) -> Self {
        Self {
            credentials,
            token_client,
            mail,
            extractor,
            summarizer,
            synthesizer,
            repository,
            categories: CategoryConfig::builtin(),
        }
    }

    /// Replaces the category taxonomy.
    #[must_use]
    pub fn with_categories(mut self, categories: CategoryConfig) -> Self {
        self.categories = categories;
        self
    }

    /// Generates (or regenerates) the digest for one owner and day.
    ///
    /// Defaults to today when `date` is `None`. Regenerating an existing day
    /// atomically replaces the previous digest. A day where no email
    /// survives extraction stores nothing and reports the empty outcome.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingCredential`] when the owner has no stored
    /// token, or an [`Error::Run`] tagging the stage where the provider or
    /// the database failed.
    pub async fn generate(&self, owner: &str, date: Option<NaiveDate>) -> Result<DigestOutcome> {
        let date = date.unwrap_or_else(|| Utc::now().date_naive());
        info!(owner, %date, "starting digest run");

        let senders = self.repository.monitored_senders(owner).await?;
        if senders.is_empty() {
            info!(owner, "no monitored senders, nothing to do");
            return Ok(DigestOutcome::empty());
        }

        let messages = self.fetch_messages(owner, &senders, date).await?;
        if messages.is_empty() {
            info!(owner, %date, "no newsletters received, empty day");
            return Ok(DigestOutcome::empty());
        }

        let cleaned = self.clean_and_summarize(messages).await;
        if cleaned.is_empty() {
            info!(owner, %date, "no email survived extraction, empty day");
            return Ok(DigestOutcome::empty());
        }

        let clusters = classify(&cleaned, &self.categories);
        debug!(clusters = clusters.len(), "classification complete");

        let mut sections = Vec::with_capacity(clusters.len());
        for cluster in &clusters {
            let narrative = match self
                .synthesizer
                .synthesize(&cluster.theme, &cluster.members)
                .await
            {
                Ok(narrative) => narrative,
                Err(e) => {
                    warn!(theme = %cluster.theme, error = %e, "synthesizer failed, using template");
                    fallback_narrative(&cluster.theme, &cluster.members, &cluster.keywords)
                }
            };

            let members = cluster
                .members
                .iter()
                .map(|member| SectionMember {
                    message_id: member.message_id.clone(),
                    relevance: relevance(&member.keywords, &cluster.keywords),
                })
                .collect();

            sections.push(NewSection {
                theme: cluster.theme.clone(),
                narrative,
                confidence: cluster.confidence,
                keywords: cluster.keywords.clone(),
                members,
            });
        }

        let digest_id = self
            .repository
            .replace_digest(owner, date, &cleaned, &sections)
            .await
            .map_err(|e| Error::run(Stage::Persist, e))?;

        info!(
            owner,
            %date,
            digest_id,
            emails = cleaned.len(),
            themes = sections.len(),
            "digest stored"
        );
        Ok(DigestOutcome {
            digest_id: Some(digest_id),
            emails_processed: cleaned.len(),
            themes_created: sections.len(),
        })
    }

    /// Ensures a usable access token and fetches the day's messages.
    async fn fetch_messages(
        &self,
        owner: &str,
        senders: &[String],
        date: NaiveDate,
    ) -> Result<Vec<RawMessage>> {
        let credential = self
            .credentials
            .get(owner)
            .await?
            .ok_or_else(|| Error::MissingCredential(owner.to_string()))?;

        let outcome = self
            .token_client
            .ensure_valid(credential, Duration::zero())
            .await
            .map_err(|e| Error::run(Stage::Fetch, e))?;
        if outcome.needs_persist() {
            self.credentials.put(outcome.credential()).await?;
        }

        let (since, until) = window_bounds(date);
        self.mail
            .fetch(senders, since, until, &outcome.credential().access_token)
            .await
            .map_err(|e| Error::run(Stage::Fetch, e))
    }

    /// Runs extraction and summarization over the fetched messages.
    ///
    /// Messages whose bodies extract to nothing are dropped with a warning.
    /// A summarizer failure downgrades that one email to the placeholder
    /// summary instead of dropping it.
    async fn clean_and_summarize(&self, messages: Vec<RawMessage>) -> Vec<CleanedEmail> {
        let mut cleaned = Vec::with_capacity(messages.len());
        for message in messages {
            let content = self.extractor.extract(&message.body).await;
            if content.is_empty() {
                warn!(id = %message.id, sender = %message.sender, "no content extracted, skipping");
                continue;
            }

            let summary = match self.summarizer.summarize(&message.subject, &content).await {
                Ok(summary) => summary,
                Err(e) => {
                    warn!(id = %message.id, error = %e, "summarizer failed, using placeholder");
                    fallback_summary()
                }
            };

            cleaned.push(CleanedEmail {
                message_id: message.id,
                sender: message.sender,
                subject: message.subject,
                received_at: message.received_at,
                permalink: message.permalink,
                content,
                summary: summary.summary,
                topics: summary.topics,
                keywords: summary.keywords,
            });
        }
        cleaned
    }

    /// Refreshes every stored credential expiring within `look_ahead`.
    ///
    /// Transient transport failures get one retry; a rejected grant does
    /// not, since repeating it cannot help. Failures are counted and logged,
    /// never fatal: one broken credential must not stop the sweep.
    ///
    /// # Errors
    ///
    /// Returns an error only when the credential store itself fails.
    pub async fn refresh_due_credentials(&self, look_ahead: Duration) -> Result<RefreshSweep> {
        let due = self.credentials.list_expiring(Utc::now() + look_ahead).await?;
        let mut sweep = RefreshSweep {
            checked: due.len(),
            ..RefreshSweep::default()
        };

        for credential in due {
            let owner = credential.owner.clone();
            match self.refresh_with_retry(credential, look_ahead).await {
                Ok(true) => sweep.refreshed += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(owner, error = %e, "credential refresh failed");
                    sweep.failed += 1;
                }
            }
        }

        info!(
            checked = sweep.checked,
            refreshed = sweep.refreshed,
            failed = sweep.failed,
            "credential sweep complete"
        );
        Ok(sweep)
    }

    /// One refresh attempt plus a single retry on transient failure.
    ///
    /// Returns whether the credential was refreshed and persisted.
    async fn refresh_with_retry(
        &self,
        credential: newsdigest_oauth::Credential,
        look_ahead: Duration,
    ) -> Result<bool> {
        let outcome = match self
            .token_client
            .ensure_valid(credential.clone(), look_ahead)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) if e.is_retryable() => {
                debug!(owner = %credential.owner, error = %e, "transient refresh failure, retrying");
                tokio::time::sleep(SWEEP_RETRY_DELAY).await;
                self.token_client.ensure_valid(credential, look_ahead).await?
            }
            Err(e) => return Err(e.into()),
        };

        if outcome.needs_persist() {
            self.credentials.put(outcome.credential()).await?;
            return Ok(true);
        }
        Ok(false)
    }
}

/// UTC day window `[00:00, next 00:00)` for a digest date.
fn window_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let since = date.and_time(NaiveTime::MIN).and_utc();
    (since, since + Duration::days(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_names_are_stable() {
        assert_eq!(Stage::Fetch.to_string(), "fetch");
        assert_eq!(Stage::Persist.as_str(), "persist");
    }

    #[test]
    fn window_covers_exactly_one_day() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap_or_default();
        let (since, until) = window_bounds(date);
        assert_eq!(since.to_rfc3339(), "2025-06-01T00:00:00+00:00");
        assert_eq!(until - since, Duration::days(1));
    }
}
