//! Gmail REST API client.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::error::{FetchError, Result};
use crate::message::{MessageDetail, MessageListResponse, RawMessage};
use crate::query::build_query;
use crate::retry::{RetryPolicy, send_with_retry};

const GMAIL_MESSAGES_URL: &str = "https://gmail.googleapis.com/gmail/v1/users/me/messages";

/// Request timeout for Gmail API calls.
const API_TIMEOUT: Duration = Duration::from_secs(30);

/// Page size for message list calls.
const LIST_PAGE_SIZE: u32 = 100;

/// A newsletter sender discovered by the inbox scan.
#[derive(Debug, Clone)]
pub struct NewsletterSender {
    /// Sender address.
    pub email: String,
    /// Display name from the From header, or the address when absent.
    pub name: String,
    /// Messages seen from this sender in the scan window.
    pub count: usize,
    /// Subject of the most recent message.
    pub latest_subject: String,
}

/// Gmail REST API client for message fetching.
#[derive(Debug, Clone)]
pub struct GmailClient {
    http_client: reqwest::Client,
    retry: RetryPolicy,
}

impl GmailClient {
    /// Creates a client with default timeout and retry policy.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new() -> Result<Self> {
        let http_client = reqwest::Client::builder().timeout(API_TIMEOUT).build()?;
        Ok(Self {
            http_client,
            retry: RetryPolicy::default(),
        })
    }

    /// Fetches all messages from `senders` received in `[since, until)`.
    ///
    /// All senders are combined into a single OR query. An empty sender set
    /// short-circuits to an empty result without touching the provider. A
    /// failure fetching one message's detail is logged and skipped; parsed
    /// messages whose sender matches none of the requested addresses are
    /// dropped (provider From headers vary in case and formatting, so the
    /// query alone is not trusted for membership).
    ///
    /// # Errors
    ///
    /// Returns an error when the list call itself fails or the token is
    /// rejected.
    pub async fn fetch(
        &self,
        senders: &[String],
        since: DateTime<Utc>,
        until: DateTime<Utc>,
        access_token: &str,
    ) -> Result<Vec<RawMessage>> {
        let valid_senders: Vec<String> = senders
            .iter()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        if valid_senders.is_empty() {
            debug!("no monitored senders, skipping provider call");
            return Ok(Vec::new());
        }

        let query = build_query(&valid_senders, since, until);
        debug!(%query, "listing messages");

        let ids = self.list_message_ids(&query, access_token).await?;
        info!(matched = ids.len(), "provider query matched messages");

        let mut messages = Vec::with_capacity(ids.len());
        for id in &ids {
            match self.get_message(id, access_token).await {
                Ok(msg) => {
                    if valid_senders.iter().any(|s| msg.sender.contains(s.as_str())) {
                        messages.push(msg);
                    } else {
                        debug!(id, sender = %msg.sender, "dropping message from unmonitored sender");
                    }
                }
                Err(e) => {
                    warn!(id, error = %e, "failed to fetch message detail, skipping");
                }
            }
        }

        info!(fetched = messages.len(), "fetch complete");
        Ok(messages)
    }

    /// Lists matching message ids, following pagination.
    async fn list_message_ids(&self, query: &str, access_token: &str) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params: Vec<(&str, String)> = vec![
                ("q", query.to_string()),
                ("maxResults", LIST_PAGE_SIZE.to_string()),
            ];
            if let Some(token) = &page_token {
                params.push(("pageToken", token.clone()));
            }

            let response = send_with_retry(
                self.http_client
                    .get(GMAIL_MESSAGES_URL)
                    .bearer_auth(access_token)
                    .query(&params),
                &self.retry,
            )
            .await?;

            let list: MessageListResponse = Self::decode(response).await?;
            ids.extend(list.messages.into_iter().map(|m| m.id));

            page_token = list.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        Ok(ids)
    }

    /// Fetches full detail for a single message.
    async fn get_message(&self, id: &str, access_token: &str) -> Result<RawMessage> {
        let url = format!("{GMAIL_MESSAGES_URL}/{id}");
        let response = send_with_retry(
            self.http_client
                .get(&url)
                .bearer_auth(access_token)
                .query(&[("format", "full")]),
            &self.retry,
        )
        .await?;

        let detail: MessageDetail = Self::decode(response).await?;
        Ok(detail.into_raw_message())
    }

    /// Scans the inbox for likely newsletter senders.
    ///
    /// Looks back three days for messages mentioning "unsubscribe", groups
    /// them by sender, keeps senders whose bodies contain unsubscribe
    /// patterns, and sorts by message count descending. Used during
    /// onboarding to suggest monitored addresses.
    ///
    /// # Errors
    ///
    /// Returns an error when the list call fails or the token is rejected.
    pub async fn scan_newsletters(&self, access_token: &str) -> Result<Vec<NewsletterSender>> {
        let after = (Utc::now() - chrono::Duration::days(3)).format("%Y/%m/%d");
        let query = format!("after:{after} unsubscribe");
        debug!(%query, "scanning for newsletter senders");

        let ids = self.list_message_ids(&query, access_token).await?;

        let mut by_sender: HashMap<String, NewsletterSender> = HashMap::new();
        for id in ids.iter().take(100) {
            let msg = match self.get_message(id, access_token).await {
                Ok(msg) => msg,
                Err(e) => {
                    warn!(id, error = %e, "failed to fetch scan candidate, skipping");
                    continue;
                }
            };
            if msg.sender.is_empty() || !has_unsubscribe_marker(&msg.body) {
                continue;
            }

            by_sender
                .entry(msg.sender.clone())
                .and_modify(|entry| {
                    entry.count += 1;
                    entry.latest_subject.clone_from(&msg.subject);
                })
                .or_insert_with(|| NewsletterSender {
                    email: msg.sender.clone(),
                    name: msg.sender.clone(),
                    count: 1,
                    latest_subject: msg.subject.clone(),
                });
        }

        let mut senders: Vec<NewsletterSender> = by_sender.into_values().collect();
        senders.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.email.cmp(&b.email)));
        info!(found = senders.len(), "newsletter scan complete");
        Ok(senders)
    }

    /// Decodes a response, mapping auth and API failures to [`FetchError`].
    async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(FetchError::AuthExpired);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(FetchError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json().await?)
    }
}

/// True when the body carries a common unsubscribe phrase.
fn has_unsubscribe_marker(body: &str) -> bool {
    const MARKERS: &[&str] = &[
        "unsubscribe",
        "opt-out",
        "manage preferences",
        "email preferences",
        "subscription settings",
        "list-unsubscribe",
    ];
    let lower = body.to_lowercase();
    MARKERS.iter().any(|m| lower.contains(m))
}
