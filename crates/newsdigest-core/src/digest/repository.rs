//! Digest repository for persistent storage of generated digests.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};

use super::model::{
    CleanedEmail, Digest, DigestEmail, NewSection, SourceLink, StoredDigest, ThemeSection,
};
use crate::Result;

/// Storage format for digest dates.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Repository for digests and the monitored sender list.
#[derive(Clone)]
pub struct DigestRepository {
    pool: SqlitePool,
}

impl DigestRepository {
    /// Create a new repository with the given database path.
    ///
    /// Creates the database and tables if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn new(database_path: &str) -> Result<Self> {
        let url = format!("sqlite:{database_path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let repo = Self { pool };
        repo.initialize().await?;
        Ok(repo)
    }

    /// Create an in-memory repository for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let repo = Self { pool };
        repo.initialize().await?;
        Ok(repo)
    }

    /// Initialize database schema.
    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS digests (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner TEXT NOT NULL,
                digest_date TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(owner, digest_date)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS digest_emails (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                digest_id INTEGER NOT NULL REFERENCES digests(id),
                message_id TEXT NOT NULL,
                sender TEXT NOT NULL,
                subject TEXT NOT NULL,
                received_at TEXT NOT NULL,
                permalink TEXT NOT NULL DEFAULT '',
                content TEXT NOT NULL,
                summary TEXT NOT NULL DEFAULT '',
                topics TEXT NOT NULL DEFAULT '[]',
                keywords TEXT NOT NULL DEFAULT '[]'
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS theme_sections (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                digest_id INTEGER NOT NULL REFERENCES digests(id),
                theme TEXT NOT NULL,
                narrative TEXT NOT NULL,
                confidence INTEGER NOT NULL,
                keywords TEXT NOT NULL DEFAULT '[]',
                entities TEXT NOT NULL DEFAULT '[]',
                display_order INTEGER NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS theme_source_links (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                section_id INTEGER NOT NULL REFERENCES theme_sections(id),
                email_id INTEGER NOT NULL REFERENCES digest_emails(id),
                relevance INTEGER NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS monitored_senders (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner TEXT NOT NULL,
                email TEXT NOT NULL,
                active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(owner, email)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        // Index for the daily lookup path
        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_digests_owner_date
            ON digests(owner, digest_date)
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Replace the digest for `(owner, date)` with freshly generated content.
    ///
    /// Any previous digest for the same owner and day is deleted together
    /// with its emails, sections, and links, then the new rows are written.
    /// The whole swap runs in one transaction: a failure leaves the previous
    /// digest fully intact. Returns the new digest's id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails or a section member
    /// references a message id that is not in `emails`.
    pub async fn replace_digest(
        &self,
        owner: &str,
        date: NaiveDate,
        emails: &[CleanedEmail],
        sections: &[NewSection],
    ) -> Result<i64> {
        let date_str = date.format(DATE_FORMAT).to_string();
        let mut tx = self.pool.begin().await?;

        let existing: Option<i64> =
            sqlx::query("SELECT id FROM digests WHERE owner = ? AND digest_date = ?")
                .bind(owner)
                .bind(&date_str)
                .fetch_optional(&mut *tx)
                .await?
                .map(|r| r.get("id"));

        if let Some(old_id) = existing {
            sqlx::query(
                r"
                DELETE FROM theme_source_links
                WHERE section_id IN (SELECT id FROM theme_sections WHERE digest_id = ?)
                ",
            )
            .bind(old_id)
            .execute(&mut *tx)
            .await?;

            sqlx::query("DELETE FROM theme_sections WHERE digest_id = ?")
                .bind(old_id)
                .execute(&mut *tx)
                .await?;

            sqlx::query("DELETE FROM digest_emails WHERE digest_id = ?")
                .bind(old_id)
                .execute(&mut *tx)
                .await?;

            sqlx::query("DELETE FROM digests WHERE id = ?")
                .bind(old_id)
                .execute(&mut *tx)
                .await?;
        }

        let digest_id = sqlx::query(
            r"
            INSERT INTO digests (owner, digest_date, created_at)
            VALUES (?, ?, ?)
            ",
        )
        .bind(owner)
        .bind(&date_str)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        let mut email_ids: HashMap<&str, i64> = HashMap::with_capacity(emails.len());
        for email in emails {
            let id = sqlx::query(
                r"
                INSERT INTO digest_emails
                    (digest_id, message_id, sender, subject, received_at,
                     permalink, content, summary, topics, keywords)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ",
            )
            .bind(digest_id)
            .bind(&email.message_id)
            .bind(&email.sender)
            .bind(&email.subject)
            .bind(email.received_at.to_rfc3339())
            .bind(&email.permalink)
            .bind(&email.content)
            .bind(&email.summary)
            .bind(serde_json::to_string(&email.topics)?)
            .bind(serde_json::to_string(&email.keywords)?)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

            email_ids.insert(email.message_id.as_str(), id);
        }

        for (order, section) in sections.iter().enumerate() {
            let section_id = sqlx::query(
                r"
                INSERT INTO theme_sections
                    (digest_id, theme, narrative, confidence, keywords, entities, display_order)
                VALUES (?, ?, ?, ?, ?, '[]', ?)
                ",
            )
            .bind(digest_id)
            .bind(&section.theme)
            .bind(&section.narrative)
            .bind(i64::from(section.confidence))
            .bind(serde_json::to_string(&section.keywords)?)
            .bind(i64::try_from(order).unwrap_or(i64::MAX))
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

            for member in &section.members {
                let email_id = email_ids.get(member.message_id.as_str()).ok_or_else(|| {
                    crate::Error::Config(format!(
                        "section '{}' references unknown message {}",
                        section.theme, member.message_id
                    ))
                })?;

                sqlx::query(
                    r"
                    INSERT INTO theme_source_links (section_id, email_id, relevance)
                    VALUES (?, ?, ?)
                    ",
                )
                .bind(section_id)
                .bind(email_id)
                .bind(i64::from(member.relevance))
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(digest_id)
    }

    /// Get the complete stored digest for `(owner, date)`.
    ///
    /// Returns `None` when no digest exists for that day.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get_digest(&self, owner: &str, date: NaiveDate) -> Result<Option<StoredDigest>> {
        let date_str = date.format(DATE_FORMAT).to_string();

        let row = sqlx::query(
            r"
            SELECT id, owner, digest_date, created_at
            FROM digests
            WHERE owner = ? AND digest_date = ?
            ",
        )
        .bind(owner)
        .bind(&date_str)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let digest = row_to_digest(&row);

        let emails = sqlx::query(
            r"
            SELECT id, digest_id, message_id, sender, subject, received_at,
                   permalink, content, summary, topics, keywords
            FROM digest_emails
            WHERE digest_id = ?
            ORDER BY received_at
            ",
        )
        .bind(digest.id)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(row_to_email)
        .collect();

        let sections: Vec<ThemeSection> = sqlx::query(
            r"
            SELECT id, digest_id, theme, narrative, confidence, keywords, entities, display_order
            FROM theme_sections
            WHERE digest_id = ?
            ORDER BY display_order
            ",
        )
        .bind(digest.id)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(row_to_section)
        .collect();

        let links = sqlx::query(
            r"
            SELECT section_id, email_id, relevance
            FROM theme_source_links
            WHERE section_id IN (SELECT id FROM theme_sections WHERE digest_id = ?)
            ",
        )
        .bind(digest.id)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(row_to_link)
        .collect();

        Ok(Some(StoredDigest {
            digest,
            emails,
            sections,
            links,
        }))
    }

    /// Number of stored digests for an owner. Used by status reporting.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn digest_count(&self, owner: &str) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM digests WHERE owner = ?")
            .bind(owner)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    /// Add a sender address to an owner's monitored list.
    ///
    /// Re-adding a previously removed sender reactivates it.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn add_monitored_sender(&self, owner: &str, email: &str) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO monitored_senders (owner, email, active)
            VALUES (?, ?, 1)
            ON CONFLICT(owner, email) DO UPDATE SET active = 1
            ",
        )
        .bind(owner)
        .bind(email.trim().to_lowercase())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Deactivate a monitored sender.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn remove_monitored_sender(&self, owner: &str, email: &str) -> Result<()> {
        sqlx::query("UPDATE monitored_senders SET active = 0 WHERE owner = ? AND email = ?")
            .bind(owner)
            .bind(email.trim().to_lowercase())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Active monitored sender addresses for an owner, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn monitored_senders(&self, owner: &str) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r"
            SELECT email FROM monitored_senders
            WHERE owner = ? AND active = 1
            ORDER BY email
            ",
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|r| r.get("email")).collect())
    }
}

fn row_to_digest(row: &SqliteRow) -> Digest {
    Digest {
        id: row.get("id"),
        owner: row.get("owner"),
        digest_date: parse_date(&row.get::<String, _>("digest_date")),
        created_at: parse_timestamp(&row.get::<String, _>("created_at")),
    }
}

fn row_to_email(row: &SqliteRow) -> DigestEmail {
    DigestEmail {
        id: row.get("id"),
        digest_id: row.get("digest_id"),
        email: CleanedEmail {
            message_id: row.get("message_id"),
            sender: row.get("sender"),
            subject: row.get("subject"),
            received_at: parse_timestamp(&row.get::<String, _>("received_at")),
            permalink: row.get("permalink"),
            content: row.get("content"),
            summary: row.get("summary"),
            topics: parse_list(&row.get::<String, _>("topics")),
            keywords: parse_list(&row.get::<String, _>("keywords")),
        },
    }
}

fn row_to_section(row: &SqliteRow) -> ThemeSection {
    ThemeSection {
        id: row.get("id"),
        digest_id: row.get("digest_id"),
        theme: row.get("theme"),
        narrative: row.get("narrative"),
        confidence: parse_score(row.get("confidence")),
        keywords: parse_list(&row.get::<String, _>("keywords")),
        entities: parse_list(&row.get::<String, _>("entities")),
        display_order: row.get("display_order"),
    }
}

fn row_to_link(row: &SqliteRow) -> SourceLink {
    SourceLink {
        section_id: row.get("section_id"),
        email_id: row.get("email_id"),
        relevance: parse_score(row.get("relevance")),
    }
}

fn parse_date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap_or_default()
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_default()
}

fn parse_list(s: &str) -> Vec<String> {
    serde_json::from_str(s).unwrap_or_default()
}

fn parse_score(value: i64) -> u8 {
    u8::try_from(value.clamp(0, 100)).unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::digest::model::SectionMember;
    use chrono::TimeZone;

    fn email(id: &str, subject: &str) -> CleanedEmail {
        CleanedEmail {
            message_id: id.to_string(),
            sender: "news@example.com".to_string(),
            subject: subject.to_string(),
            received_at: Utc.with_ymd_and_hms(2025, 6, 1, 8, 30, 0).unwrap(),
            permalink: format!("https://mail.google.com/mail/u/0/#inbox/{id}"),
            content: "Body text long enough to matter.".to_string(),
            summary: "A summary.".to_string(),
            topics: vec!["Technology".to_string()],
            keywords: vec!["rust".to_string(), "async".to_string()],
        }
    }

    fn section(theme: &str, member_ids: &[&str]) -> NewSection {
        NewSection {
            theme: theme.to_string(),
            narrative: format!("{theme} narrative."),
            confidence: 75,
            keywords: vec!["rust".to_string()],
            members: member_ids
                .iter()
                .map(|id| SectionMember {
                    message_id: (*id).to_string(),
                    relevance: 80,
                })
                .collect(),
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    #[tokio::test]
    async fn stores_and_reads_back_a_digest() {
        let repo = DigestRepository::in_memory().await.unwrap();
        let emails = vec![email("m1", "First"), email("m2", "Second")];
        let sections = vec![section("Science", &["m1", "m2"])];

        let id = repo
            .replace_digest("user@example.com", day(), &emails, &sections)
            .await
            .unwrap();

        let stored = repo.get_digest("user@example.com", day()).await.unwrap().unwrap();
        assert_eq!(stored.digest.id, id);
        assert_eq!(stored.digest.digest_date, day());
        assert_eq!(stored.emails.len(), 2);
        assert_eq!(stored.sections.len(), 1);
        assert_eq!(stored.links.len(), 2);
        assert_eq!(stored.sections[0].theme, "Science");
        assert_eq!(stored.sections[0].confidence, 75);
        assert_eq!(stored.links[0].relevance, 80);
        assert_eq!(stored.emails[0].email.keywords, vec!["rust", "async"]);
    }

    #[tokio::test]
    async fn replacing_is_idempotent() {
        let repo = DigestRepository::in_memory().await.unwrap();
        let emails = vec![email("m1", "First")];
        let sections = vec![section("Science", &["m1"])];

        repo.replace_digest("user@example.com", day(), &emails, &sections)
            .await
            .unwrap();
        repo.replace_digest("user@example.com", day(), &emails, &sections)
            .await
            .unwrap();

        assert_eq!(repo.digest_count("user@example.com").await.unwrap(), 1);
        let stored = repo.get_digest("user@example.com", day()).await.unwrap().unwrap();
        assert_eq!(stored.emails.len(), 1);
        assert_eq!(stored.sections.len(), 1);
        assert_eq!(stored.links.len(), 1);
    }

    #[tokio::test]
    async fn replacement_swaps_content() {
        let repo = DigestRepository::in_memory().await.unwrap();
        repo.replace_digest(
            "user@example.com",
            day(),
            &[email("m1", "First")],
            &[section("Science", &["m1"])],
        )
        .await
        .unwrap();

        repo.replace_digest(
            "user@example.com",
            day(),
            &[email("m9", "Replacement")],
            &[section("Sports", &["m9"])],
        )
        .await
        .unwrap();

        let stored = repo.get_digest("user@example.com", day()).await.unwrap().unwrap();
        assert_eq!(stored.emails.len(), 1);
        assert_eq!(stored.emails[0].email.subject, "Replacement");
        assert_eq!(stored.sections[0].theme, "Sports");
    }

    #[tokio::test]
    async fn missing_digest_is_none() {
        let repo = DigestRepository::in_memory().await.unwrap();
        assert!(repo.get_digest("user@example.com", day()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_section_member_rolls_back() {
        let repo = DigestRepository::in_memory().await.unwrap();
        let err = repo
            .replace_digest(
                "user@example.com",
                day(),
                &[email("m1", "First")],
                &[section("Science", &["ghost"])],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));

        // The transaction rolled back; nothing was written.
        assert_eq!(repo.digest_count("user@example.com").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn digests_are_scoped_per_owner() {
        let repo = DigestRepository::in_memory().await.unwrap();
        repo.replace_digest("a@example.com", day(), &[email("m1", "A")], &[])
            .await
            .unwrap();
        repo.replace_digest("b@example.com", day(), &[email("m1", "B")], &[])
            .await
            .unwrap();

        let a = repo.get_digest("a@example.com", day()).await.unwrap().unwrap();
        assert_eq!(a.emails[0].email.subject, "A");
        assert_eq!(repo.digest_count("b@example.com").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn monitored_sender_lifecycle() {
        let repo = DigestRepository::in_memory().await.unwrap();
        repo.add_monitored_sender("u@example.com", " News@Letters.example ")
            .await
            .unwrap();
        repo.add_monitored_sender("u@example.com", "daily@brief.example")
            .await
            .unwrap();

        let senders = repo.monitored_senders("u@example.com").await.unwrap();
        assert_eq!(senders, vec!["daily@brief.example", "news@letters.example"]);

        repo.remove_monitored_sender("u@example.com", "daily@brief.example")
            .await
            .unwrap();
        let senders = repo.monitored_senders("u@example.com").await.unwrap();
        assert_eq!(senders, vec!["news@letters.example"]);

        // Re-adding reactivates.
        repo.add_monitored_sender("u@example.com", "daily@brief.example")
            .await
            .unwrap();
        assert_eq!(repo.monitored_senders("u@example.com").await.unwrap().len(), 2);
    }
}
