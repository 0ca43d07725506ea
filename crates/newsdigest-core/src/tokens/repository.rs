//! SQLite-backed credential storage.

use chrono::{DateTime, Utc};
use newsdigest_oauth::Credential;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};

use crate::Result;
use crate::ports::CredentialStore;

/// Repository for per-owner OAuth credentials.
///
/// One row per owner; `put` upserts. Timestamps are stored as RFC 3339
/// strings in UTC, which also makes them lexically comparable in SQL.
#[derive(Clone)]
pub struct SqliteTokenStore {
    pool: SqlitePool,
}

impl SqliteTokenStore {
    /// Create a new store with the given database path.
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

        let store = Self { pool };
        store.initialize().await?;
        Ok(store)
    }

    /// Create an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let store = Self { pool };
        store.initialize().await?;
        Ok(store)
    }

    /// Initialize database schema.
    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS oauth_tokens (
                owner TEXT PRIMARY KEY,
                access_token TEXT NOT NULL,
                refresh_token TEXT,
                expires_at TEXT,
                scope TEXT,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Delete an owner's stored credential.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn delete(&self, owner: &str) -> Result<()> {
        sqlx::query("DELETE FROM oauth_tokens WHERE owner = ?")
            .bind(owner)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

impl CredentialStore for SqliteTokenStore {
    async fn get(&self, owner: &str) -> Result<Option<Credential>> {
        let row = sqlx::query(
            r"
            SELECT owner, access_token, refresh_token, expires_at, scope
            FROM oauth_tokens
            WHERE owner = ?
            ",
        )
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| row_to_credential(&r)))
    }

    async fn put(&self, credential: &Credential) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO oauth_tokens (owner, access_token, refresh_token, expires_at, scope, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(owner) DO UPDATE SET
                access_token = excluded.access_token,
                refresh_token = excluded.refresh_token,
                expires_at = excluded.expires_at,
                scope = excluded.scope,
                updated_at = excluded.updated_at
            ",
        )
        .bind(&credential.owner)
        .bind(&credential.access_token)
        .bind(&credential.refresh_token)
        .bind(credential.expires_at.map(|d| d.to_rfc3339()))
        .bind(&credential.scope)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_expiring(&self, before: DateTime<Utc>) -> Result<Vec<Credential>> {
        // A NULL expiry means validity is unknown; treat it as due.
        let rows = sqlx::query(
            r"
            SELECT owner, access_token, refresh_token, expires_at, scope
            FROM oauth_tokens
            WHERE expires_at IS NULL OR expires_at <= ?
            ORDER BY owner
            ",
        )
        .bind(before.to_rfc3339())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_credential).collect())
    }
}

fn row_to_credential(row: &SqliteRow) -> Credential {
    let mut credential = Credential::new(
        row.get::<String, _>("owner"),
        row.get::<String, _>("access_token"),
    );
    if let Some(refresh) = row.get::<Option<String>, _>("refresh_token") {
        credential = credential.with_refresh_token(refresh);
    }
    if let Some(expires) = row.get::<Option<String>, _>("expires_at") {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(&expires) {
            credential = credential.with_expires_at(parsed.with_timezone(&Utc));
        }
    }
    if let Some(scope) = row.get::<Option<String>, _>("scope") {
        credential = credential.with_scope(scope);
    }
    credential
}
