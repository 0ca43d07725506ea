//! Error types for the core library.

use thiserror::Error;

use crate::pipeline::Stage;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Credential lifecycle failure.
    #[error("Credential error: {0}")]
    Credential(#[from] newsdigest_oauth::CredentialError),

    /// Mail provider failure.
    #[error("Fetch error: {0}")]
    Fetch(#[from] newsdigest_gmail::FetchError),

    /// Extractor construction failure.
    #[error("Extraction error: {0}")]
    Extract(#[from] newsdigest_extract::ExtractError),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// No stored credential for the given owner.
    #[error("No stored credential for {0}")]
    MissingCredential(String),

    /// A digest run failed, tagged with the stage that broke.
    #[error("Digest run failed during {stage}: {source}")]
    Run {
        /// Pipeline stage that failed.
        stage: Stage,
        /// Underlying failure.
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wraps an error with the pipeline stage it occurred in.
    pub fn run(stage: Stage, source: impl Into<Self>) -> Self {
        Self::Run {
            stage,
            source: Box::new(source.into()),
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
