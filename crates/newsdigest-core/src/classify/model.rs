//! Classification output models.

use crate::digest::CleanedEmail;

/// A group of emails sharing one theme.
#[derive(Debug, Clone)]
pub struct ThemeCluster {
    /// Theme label, taken from the category taxonomy.
    pub theme: String,
    /// Member emails. An email may belong to several clusters, but appears
    /// at most once within one cluster.
    pub members: Vec<CleanedEmail>,
    /// Representative keywords, most frequent first.
    pub keywords: Vec<String>,
    /// Cluster confidence, 60 to 95.
    pub confidence: u8,
}

impl ThemeCluster {
    /// Ordering weight: member count times confidence.
    ///
    /// Bigger, more confident clusters lead the digest.
    #[must_use]
    pub fn weight(&self) -> u64 {
        u64::try_from(self.members.len()).unwrap_or(u64::MAX) * u64::from(self.confidence)
    }
}
