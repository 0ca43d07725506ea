//! # newsdigest-oauth
//!
//! `OAuth2` credential lifecycle management for the digest pipeline.
//!
//! This crate owns the stored credential shape and the decision of when a
//! refresh is needed. It never touches persistent storage: `ensure_valid`
//! returns an [`EnsureOutcome`] and the caller is responsible for writing a
//! refreshed credential back through its token store.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod client;
mod credential;
mod error;

pub use client::{EnsureOutcome, TokenClient};
pub use credential::{Credential, TokenErrorResponse, TokenResponse};
pub use error::{CredentialError, Result};
