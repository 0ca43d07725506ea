//! Keyword-driven thematic classification.
//!
//! Deterministic by construction: the same emails against the same taxonomy
//! always produce the same clusters, confidences, and ordering. No model
//! calls, no randomness.

mod categories;
mod model;

use std::collections::{HashMap, HashSet};

pub use categories::{Category, CategoryConfig, OTHER_LABEL};
pub use model::ThemeCluster;

use categories::{
    CONFIDENCE_MAX, CONFIDENCE_MIN, KEYWORD_HIT, MAX_CLUSTER_KEYWORDS, PRIMARY_SENDER_BONUS,
    QUALIFY_THRESHOLD, SCORE_CAP, SECONDARY_SENDER_BONUS, SUBJECT_HIT, TOPIC_HIT,
};

use crate::digest::CleanedEmail;

/// Groups emails into theme clusters.
///
/// An email joins every category whose score clears the qualification
/// threshold, so clusters may overlap. Emails qualifying nowhere fall into
/// the catch-all [`OTHER_LABEL`] cluster at the fixed floor confidence.
/// Clusters come back ordered by weight (member count times confidence)
/// descending, ties broken by label.
#[must_use]
pub fn classify(emails: &[CleanedEmail], config: &CategoryConfig) -> Vec<ThemeCluster> {
    let mut buckets: Vec<(Vec<CleanedEmail>, Vec<u32>)> =
        vec![(Vec::new(), Vec::new()); config.categories.len()];
    let mut other: Vec<CleanedEmail> = Vec::new();

    for email in emails {
        let mut matched = false;
        for (bucket, category) in buckets.iter_mut().zip(&config.categories) {
            let score = category_score(email, category);
            if score > QUALIFY_THRESHOLD {
                bucket.0.push(email.clone());
                bucket.1.push(score);
                matched = true;
            }
        }
        if !matched {
            other.push(email.clone());
        }
    }

    let mut clusters: Vec<ThemeCluster> = config
        .categories
        .iter()
        .zip(buckets)
        .filter(|(_, (members, _))| !members.is_empty())
        .map(|(category, (members, scores))| ThemeCluster {
            theme: category.label.clone(),
            keywords: cluster_keywords(&members),
            confidence: confidence(&scores),
            members,
        })
        .collect();

    if !other.is_empty() {
        clusters.push(ThemeCluster {
            theme: OTHER_LABEL.to_string(),
            keywords: cluster_keywords(&other),
            confidence: CONFIDENCE_MIN,
            members: other,
        });
    }

    clusters.sort_by(|a, b| {
        b.weight()
            .cmp(&a.weight())
            .then_with(|| a.theme.cmp(&b.theme))
    });
    clusters
}

/// Scores one email against one category.
///
/// Keywords are matched as substrings of the searchable text (subject,
/// summary, topics, keywords). Subject and topic hits earn extra points, a
/// recognized sender domain earns a flat bonus, and the total is capped.
#[must_use]
pub fn category_score(email: &CleanedEmail, category: &Category) -> u32 {
    let subject = email.subject.to_lowercase();
    let topics: Vec<String> = email.topics.iter().map(|t| t.to_lowercase()).collect();
    let haystack = format!(
        "{subject} {} {} {}",
        email.summary.to_lowercase(),
        topics.join(" "),
        email.keywords.join(" ").to_lowercase()
    );

    let mut score = 0;
    for keyword in &category.keywords {
        if !haystack.contains(keyword.as_str()) {
            continue;
        }
        score += KEYWORD_HIT;
        if subject.contains(keyword.as_str()) {
            score += SUBJECT_HIT;
        }
        if topics.iter().any(|t| t.contains(keyword.as_str())) {
            score += TOPIC_HIT;
        }
    }

    score += sender_bonus(&email.sender, category);
    score.min(SCORE_CAP)
}

fn sender_bonus(sender: &str, category: &Category) -> u32 {
    if category.primary_domains.iter().any(|d| sender.contains(d)) {
        PRIMARY_SENDER_BONUS
    } else if category.secondary_domains.iter().any(|d| sender.contains(d)) {
        SECONDARY_SENDER_BONUS
    } else {
        0
    }
}

/// Mean member score, rounded and clamped to the confidence band.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn confidence(scores: &[u32]) -> u8 {
    if scores.is_empty() {
        return CONFIDENCE_MIN;
    }
    let mean = f64::from(scores.iter().sum::<u32>()) / scores.len() as f64;
    (mean.round() as u8).clamp(CONFIDENCE_MIN, CONFIDENCE_MAX)
}

/// Pools member keywords, ranked by frequency then alphabetically.
fn cluster_keywords(members: &[CleanedEmail]) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for member in members {
        for keyword in &member.keywords {
            *counts.entry(keyword.to_lowercase()).or_default() += 1;
        }
    }

    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
        .into_iter()
        .take(MAX_CLUSTER_KEYWORDS)
        .map(|(keyword, _)| keyword)
        .collect()
}

/// Overlap of two keyword lists as a 0 to 100 score.
///
/// Case-insensitive set intersection over the larger set's size. When both
/// lists are empty there is no evidence either way, so the midpoint 50 is
/// returned.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub fn relevance(a: &[String], b: &[String]) -> u8 {
    let a_set: HashSet<String> = a.iter().map(|k| k.to_lowercase()).collect();
    let b_set: HashSet<String> = b.iter().map(|k| k.to_lowercase()).collect();

    let denominator = a_set.len().max(b_set.len());
    if denominator == 0 {
        return 50;
    }

    let shared = a_set.intersection(&b_set).count();
    (100.0 * shared as f64 / denominator as f64).round() as u8
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn email(id: &str, sender: &str, subject: &str, topics: &[&str], keywords: &[&str]) -> CleanedEmail {
        CleanedEmail {
            message_id: id.to_string(),
            sender: sender.to_string(),
            subject: subject.to_string(),
            received_at: Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap(),
            permalink: String::new(),
            content: "Long enough body.".to_string(),
            summary: subject.to_string(),
            topics: topics.iter().map(ToString::to_string).collect(),
            keywords: keywords.iter().map(ToString::to_string).collect(),
        }
    }

    fn ml_email() -> CleanedEmail {
        email(
            "m1",
            "digest@devnews.example",
            "New machine learning API released",
            &["Technology"],
            &["machine learning", "api", "models"],
        )
    }

    fn earnings_email() -> CleanedEmail {
        email(
            "m2",
            "brief@marketwatch.example",
            "Quarterly earnings beat expectations",
            &["Markets"],
            &["earnings", "quarterly", "stocks"],
        )
    }

    fn knitting_email() -> CleanedEmail {
        email(
            "m3",
            "yarn@crafts.example",
            "This week in knitting patterns",
            &[],
            &["knitting", "yarn"],
        )
    }

    #[test]
    fn thematic_emails_land_in_their_categories() {
        let config = CategoryConfig::builtin();
        let clusters = classify(&[ml_email(), earnings_email()], &config);

        let labels: Vec<&str> = clusters.iter().map(|c| c.theme.as_str()).collect();
        assert!(labels.contains(&"Programming and Computer Engineering"));
        assert!(labels.contains(&"Business + Finance"));
        assert!(!labels.contains(&OTHER_LABEL));
    }

    #[test]
    fn unmatched_email_falls_into_other_at_floor_confidence() {
        let config = CategoryConfig::builtin();
        let clusters = classify(&[knitting_email()], &config);

        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].theme, OTHER_LABEL);
        assert_eq!(clusters[0].confidence, 60);
        assert_eq!(clusters[0].members[0].message_id, "m3");
    }

    #[test]
    fn sender_bonus_alone_never_qualifies() {
        let config = CategoryConfig::builtin();
        let from_github = email(
            "m4",
            "noreply@github.com",
            "Nothing topical here",
            &[],
            &[],
        );

        let programming = config
            .categories
            .iter()
            .find(|c| c.label == "Programming and Computer Engineering")
            .unwrap();
        assert_eq!(category_score(&from_github, programming), 20);

        let clusters = classify(&[from_github], &config);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].theme, OTHER_LABEL);
    }

    #[test]
    fn secondary_domain_earns_smaller_bonus() {
        let config = CategoryConfig::builtin();
        let from_dev_to = email("m5", "weekly@dev.to", "Nothing topical here", &[], &[]);

        let programming = config
            .categories
            .iter()
            .find(|c| c.label == "Programming and Computer Engineering")
            .unwrap();
        assert_eq!(category_score(&from_dev_to, programming), 15);
    }

    #[test]
    fn subject_and_topic_hits_stack() {
        let config = CategoryConfig::builtin();
        let programming = config
            .categories
            .iter()
            .find(|c| c.label == "Programming and Computer Engineering")
            .unwrap();

        // "machine learning": keyword 10 + subject 15. "api": keyword 10 +
        // subject 15. "models" matches nothing in the taxonomy.
        assert_eq!(category_score(&ml_email(), programming), 50);
    }

    #[test]
    fn one_email_can_join_several_clusters() {
        let config = CategoryConfig::builtin();
        let crossover = email(
            "m6",
            "news@letters.example",
            "Machine learning startup lands funding",
            &[],
            &["machine learning", "api", "startup", "funding"],
        );

        let clusters = classify(&[crossover], &config);
        let labels: Vec<&str> = clusters.iter().map(|c| c.theme.as_str()).collect();
        assert!(labels.contains(&"Programming and Computer Engineering"));
        assert!(labels.contains(&"Business + Finance"));
    }

    #[test]
    fn classification_is_deterministic() {
        let config = CategoryConfig::builtin();
        let emails = vec![ml_email(), earnings_email(), knitting_email()];

        let first = classify(&emails, &config);
        let second = classify(&emails, &config);

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.theme, b.theme);
            assert_eq!(a.confidence, b.confidence);
            assert_eq!(a.keywords, b.keywords);
            let a_ids: Vec<&str> = a.members.iter().map(|m| m.message_id.as_str()).collect();
            let b_ids: Vec<&str> = b.members.iter().map(|m| m.message_id.as_str()).collect();
            assert_eq!(a_ids, b_ids);
        }
    }

    #[test]
    fn bigger_clusters_sort_first() {
        let config = CategoryConfig::builtin();
        let second_ml = email(
            "m7",
            "digest@devnews.example",
            "Why every compiler is a database",
            &["Technology"],
            &["compiler", "database", "rust"],
        );

        let clusters = classify(&[ml_email(), second_ml, earnings_email()], &config);
        assert_eq!(clusters[0].theme, "Programming and Computer Engineering");
        assert_eq!(clusters[0].members.len(), 2);
    }

    #[test]
    fn confidence_stays_in_band() {
        // Score 100 for every member still reads 95; a bare qualifier reads 60.
        assert_eq!(confidence(&[100, 100]), 95);
        assert_eq!(confidence(&[31]), 60);
        assert_eq!(confidence(&[75, 85]), 80);
    }

    #[test]
    fn cluster_keywords_rank_by_frequency() {
        let members = vec![
            email("a", "s@example.com", "x", &[], &["rust", "api"]),
            email("b", "s@example.com", "y", &[], &["rust", "compiler"]),
        ];
        let keywords = cluster_keywords(&members);
        assert_eq!(keywords[0], "rust");
        // Ties resolve alphabetically.
        assert_eq!(&keywords[1..], ["api", "compiler"]);
    }

    #[test]
    fn relevance_scoring() {
        let a = vec!["rust".to_string(), "api".to_string()];
        let b = vec!["Rust".to_string(), "api".to_string()];
        assert_eq!(relevance(&a, &b), 100);

        let c = vec!["rust".to_string()];
        assert_eq!(relevance(&a, &c), 50);

        let d = vec!["cooking".to_string()];
        assert_eq!(relevance(&a, &d), 0);

        assert_eq!(relevance(&[], &[]), 50);
        assert_eq!(relevance(&a, &[]), 0);
    }
}
