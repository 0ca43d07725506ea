//! # newsdigest-core
//!
//! Core pipeline for the `newsdigest` newsletter digester.
//!
//! This crate provides:
//! - Pipeline orchestration (fetch, extract, classify, persist)
//! - Keyword-driven thematic classification
//! - Digest storage (`SQLite`)
//! - Credential storage and the refresh sweep
//! - Ports for the mail provider, summarizer, and synthesizer backends

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod classify;
pub mod config;
pub mod digest;
mod error;
pub mod pipeline;
pub mod ports;
pub mod tokens;

pub use classify::{Category, CategoryConfig, OTHER_LABEL, ThemeCluster, classify, relevance};
pub use config::PipelineConfig;
pub use digest::{
    CleanedEmail, Digest, DigestEmail, DigestRepository, NewSection, SectionMember, SourceLink,
    StoredDigest, ThemeSection,
};
pub use error::{Error, Result};
pub use pipeline::{DigestAssembler, DigestOutcome, RefreshSweep, Stage};
pub use ports::{
    CredentialStore, EmailSummary, MailSource, SummaryError, Summarizer, Synthesizer,
    fallback_narrative, fallback_summary,
};
pub use tokens::SqliteTokenStore;
