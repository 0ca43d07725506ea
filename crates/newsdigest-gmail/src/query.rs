//! Gmail search query construction.

use chrono::{DateTime, Utc};

/// Builds a single batched Gmail search query for a set of senders and a
/// date window.
///
/// Produces `from:("a@x.com" OR "b@y.com") after:YYYY/MM/DD before:YYYY/MM/DD`.
/// Combining all senders with OR bounds the fetch at one list call instead of
/// one per sender. Gmail's `after:`/`before:` operate on whole days in the
/// account's view.
#[must_use]
pub fn build_query(senders: &[String], since: DateTime<Utc>, until: DateTime<Utc>) -> String {
    let from_clause = senders
        .iter()
        .map(|s| format!("\"{}\"", s.trim()))
        .collect::<Vec<_>>()
        .join(" OR ");

    format!(
        "from:({from_clause}) after:{} before:{}",
        since.format("%Y/%m/%d"),
        until.format("%Y/%m/%d"),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn combines_senders_with_or() {
        let since = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let until = Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap();
        let senders = vec!["a@x.com".to_string(), "b@y.com".to_string()];

        let query = build_query(&senders, since, until);
        assert_eq!(
            query,
            "from:(\"a@x.com\" OR \"b@y.com\") after:2025/06/01 before:2025/06/02"
        );
    }

    #[test]
    fn single_sender_has_no_or() {
        let since = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let until = Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap();
        let senders = vec!["news@daily.example".to_string()];

        let query = build_query(&senders, since, until);
        assert!(query.starts_with("from:(\"news@daily.example\")"));
        assert!(!query.contains(" OR "));
    }

    #[test]
    fn trims_sender_whitespace() {
        let since = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let until = Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap();
        let senders = vec![" padded@x.com ".to_string()];

        let query = build_query(&senders, since, until);
        assert!(query.contains("\"padded@x.com\""));
    }
}
