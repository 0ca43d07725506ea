//! Bounded retry with exponential backoff for transient API failures.

use std::time::Duration;

use tracing::warn;

use crate::error::FetchError;

/// Retry policy for Gmail API requests.
#[derive(Debug, Clone)]
pub(crate) struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 250,
            max_backoff_ms: 2_000,
        }
    }
}

impl RetryPolicy {
    /// Backoff before the next attempt; doubles per attempt, capped.
    pub(crate) fn delay(&self, attempt: u32) -> Duration {
        let exponent = 2u64.saturating_pow(attempt.saturating_sub(1));
        let ms = self
            .initial_backoff_ms
            .saturating_mul(exponent)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }
}

/// Sends a request, retrying transient failures up to the policy limit.
///
/// Retries on connect/timeout errors, 429, and 5xx statuses. Non-retryable
/// responses are returned to the caller for status handling.
pub(crate) async fn send_with_retry(
    request: reqwest::RequestBuilder,
    policy: &RetryPolicy,
) -> Result<reqwest::Response, FetchError> {
    let attempts = policy.max_attempts.max(1);
    for attempt in 1..=attempts {
        let Some(cloned) = request.try_clone() else {
            return request.send().await.map_err(FetchError::Http);
        };

        match cloned.send().await {
            Ok(response) => {
                let status = response.status();
                let transient = status == reqwest::StatusCode::TOO_MANY_REQUESTS
                    || status.is_server_error();
                if transient && attempt < attempts {
                    let delay = policy.delay(attempt);
                    warn!(%status, attempt, "transient Gmail API response, retrying in {delay:?}");
                    tokio::time::sleep(delay).await;
                    continue;
                }
                return Ok(response);
            }
            Err(e) if (e.is_timeout() || e.is_connect()) && attempt < attempts => {
                let delay = policy.delay(attempt);
                warn!(error = %e, attempt, "transport error, retrying in {delay:?}");
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(FetchError::Http(e)),
        }
    }
    unreachable!("retry loop always returns within max_attempts")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay(1), Duration::from_millis(250));
        assert_eq!(policy.delay(2), Duration::from_millis(500));
        assert_eq!(policy.delay(3), Duration::from_millis(1_000));
        assert_eq!(policy.delay(10), Duration::from_millis(2_000));
    }
}
