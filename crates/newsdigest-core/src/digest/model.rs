//! Digest data models.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One email after extraction and summarization, ready for classification.
///
/// This is the in-memory form of a digest email: everything the classifier
/// and the storage layer need, with the raw HTML already stripped away.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanedEmail {
    /// Provider message id.
    pub message_id: String,
    /// Sender address, lowercased.
    pub sender: String,
    /// Subject line.
    pub subject: String,
    /// When the message was received.
    pub received_at: DateTime<Utc>,
    /// Deep link back to the message in the provider's UI.
    pub permalink: String,
    /// Cleaned narrative text.
    pub content: String,
    /// Short summary of the content.
    pub summary: String,
    /// Topics assigned by the summarizer.
    pub topics: Vec<String>,
    /// Keywords assigned by the summarizer.
    pub keywords: Vec<String>,
}

/// A stored digest header row.
#[derive(Debug, Clone)]
pub struct Digest {
    /// Database id.
    pub id: i64,
    /// Mailbox owner the digest belongs to.
    pub owner: String,
    /// Calendar day the digest covers.
    pub digest_date: NaiveDate,
    /// When this digest was generated.
    pub created_at: DateTime<Utc>,
}

/// A stored digest email row.
#[derive(Debug, Clone)]
pub struct DigestEmail {
    /// Database id.
    pub id: i64,
    /// Owning digest.
    pub digest_id: i64,
    /// The email content and metadata.
    pub email: CleanedEmail,
}

/// A stored theme section row.
#[derive(Debug, Clone)]
pub struct ThemeSection {
    /// Database id.
    pub id: i64,
    /// Owning digest.
    pub digest_id: i64,
    /// Theme label.
    pub theme: String,
    /// Synthesized narrative for the theme.
    pub narrative: String,
    /// Classifier confidence, 60 to 95.
    pub confidence: u8,
    /// Representative keywords for the theme.
    pub keywords: Vec<String>,
    /// Named entities; reserved, currently always empty.
    pub entities: Vec<String>,
    /// Position of this section in the rendered digest, zero-based.
    pub display_order: i64,
}

/// A stored link between a theme section and a source email.
#[derive(Debug, Clone)]
pub struct SourceLink {
    /// Section this link belongs to.
    pub section_id: i64,
    /// Linked digest email.
    pub email_id: i64,
    /// How strongly the email matches the theme, 0 to 100.
    pub relevance: u8,
}

/// A complete stored digest: header, emails, sections, and links.
#[derive(Debug, Clone)]
pub struct StoredDigest {
    /// Digest header.
    pub digest: Digest,
    /// Emails included in the digest.
    pub emails: Vec<DigestEmail>,
    /// Theme sections in display order.
    pub sections: Vec<ThemeSection>,
    /// Section-to-email links.
    pub links: Vec<SourceLink>,
}

/// A theme section to be written, before it has a database id.
#[derive(Debug, Clone)]
pub struct NewSection {
    /// Theme label.
    pub theme: String,
    /// Synthesized narrative.
    pub narrative: String,
    /// Classifier confidence.
    pub confidence: u8,
    /// Representative keywords.
    pub keywords: Vec<String>,
    /// Member emails with their relevance scores.
    pub members: Vec<SectionMember>,
}

/// One member email of a new section.
#[derive(Debug, Clone)]
pub struct SectionMember {
    /// Provider message id of the member email.
    pub message_id: String,
    /// Relevance of the email to the section theme.
    pub relevance: u8,
}
